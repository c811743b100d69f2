//! Remote text-completion services used as the annotation engine.

mod anthropic;
mod openai;
#[cfg(test)]
pub(crate) mod testing;

pub use anthropic::AnthropicClient;
pub use openai::OpenAIClient;

use crate::config::{ModelSettings, Provider};
use crate::error::{AnnoError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One non-streaming completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// System instructions.
    pub system: String,
    /// User message (the OCR text).
    pub user: String,
    pub temperature: f32,
    /// Cap on generated tokens.
    pub max_tokens: u32,
}

/// Trait for remote completion services.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request and return the generated text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// Build the client for the configured provider, reading its API key from the environment.
pub fn create_client(settings: &ModelSettings) -> Result<Arc<dyn CompletionClient>> {
    let var = settings.provider.api_key_var();
    let api_key = std::env::var(var)
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AnnoError::Config(format!("{} not set", var)))?;
    let timeout = Duration::from_secs(settings.timeout_seconds);

    let client: Arc<dyn CompletionClient> = match settings.provider {
        Provider::Anthropic => {
            let mut client = AnthropicClient::new(api_key, timeout)?;
            if let Some(url) = &settings.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        Provider::OpenAI => Arc::new(OpenAIClient::new(
            api_key,
            settings.base_url.as_deref(),
            timeout,
        )?),
    };

    Ok(client)
}
