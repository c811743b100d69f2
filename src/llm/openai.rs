//! OpenAI chat completions client.

use super::{CompletionClient, CompletionRequest};
use crate::error::{AnnoError, Result};
use crate::openai::create_client;
use async_openai::error::{ApiError, OpenAIError};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI-backed completion client.
pub struct OpenAIClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client(&api_key, api_base, timeout)?,
        })
    }

    fn build_request(request: &CompletionRequest) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| AnnoError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| AnnoError::OpenAI(e.to_string()))?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_completion_tokens(request.max_tokens)
            .build()
            .map_err(|e| AnnoError::OpenAI(e.to_string()))
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let chat_request = Self::build_request(request)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(map_error)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(AnnoError::EmptyResponse)?;

        debug!("OpenAI response: {}", content.chars().take(200).collect::<String>());
        Ok(content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// The API reports failures by error type and code only, so the HTTP status is
/// recovered from them to keep auth and request errors classified as fatal.
fn map_error(err: OpenAIError) -> AnnoError {
    match err {
        OpenAIError::Reqwest(e) => AnnoError::Http(e),
        OpenAIError::ApiError(api) => match api_status(&api) {
            Some(status) => AnnoError::Api {
                status,
                message: api.to_string(),
            },
            None => AnnoError::OpenAI(api.to_string()),
        },
        other => AnnoError::OpenAI(other.to_string()),
    }
}

fn api_status(api: &ApiError) -> Option<u16> {
    match (api.code.as_deref(), api.r#type.as_deref()) {
        (Some("invalid_api_key"), _) | (_, Some("authentication_error")) => Some(401),
        (Some("model_not_found"), _) | (_, Some("not_found_error")) => Some(404),
        (_, Some("permission_error")) => Some(403),
        (_, Some("invalid_request_error")) => Some(400),
        _ => None,
    }
}
