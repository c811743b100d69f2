//! Configuration module for silver-anno.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{FramePrompt, Prompts};
pub use settings::{
    BackoffKind, ModelSettings, PipelineSettings, PromptSettings, Provider, RetrySettings,
    Settings, StorageSettings,
};
