//! silver-anno - silver-standard role/filler annotation of broadcast OCR text
//!
//! Chyron and credit frames from broadcast video carry names and the roles
//! attached to them. This crate asks a hosted language model to tag every
//! OCR word with an indexed role/filler label and stores the replies as a
//! silver-standard annotation column.
//!
//! # Architecture
//!
//! - `config` - Settings and the chyron/credit prompt templates
//! - `llm` - Remote completion clients (Anthropic, OpenAI)
//! - `retry` - Retry policy for remote calls
//! - `annotator` - Per-row annotation
//! - `pipeline` - Batch driver over CSV tables
//! - `table` - CSV input/output
//! - `tags` - Tag format and validator
//!
//! # Example
//!
//! ```rust,no_run
//! use silver_anno::config::Settings;
//! use silver_anno::pipeline::Pipeline;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let summary = pipeline.run(Path::new("frames/episode_42.csv")).await?;
//!     println!("Wrote {}", summary.output_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod annotator;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod retry;
pub mod table;
pub mod tags;

pub use error::{AnnoError, Result};
