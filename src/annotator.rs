//! Per-row annotation.
//!
//! Rows whose OCR was rejected get a local all-`O` tagging. Every other row is
//! sent to the remote model with the system prompt for its frame type, and the
//! reply is stored exactly as returned.

use crate::config::{ModelSettings, Prompts};
use crate::error::AnnoError;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::retry::RetryPolicy;
use crate::table::Row;
use crate::tags::{tag_all_outside, TagValidator};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Frame type of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneLabel {
    /// On-screen banner; names usually precede roles.
    Chyron,
    /// End credits; names usually follow roles.
    Credit,
}

impl std::str::FromStr for SceneLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chyron" => Ok(SceneLabel::Chyron),
            "credit" => Ok(SceneLabel::Credit),
            _ => Err(format!("Unknown scene label: {}", s)),
        }
    }
}

impl std::fmt::Display for SceneLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLabel::Chyron => write!(f, "chyron"),
            SceneLabel::Credit => write!(f, "credit"),
        }
    }
}

/// Where an annotation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationSource {
    /// Returned by the remote model.
    Model,
    /// Generated locally because OCR was rejected.
    RejectedOcr,
}

/// Result of annotating one row.
#[derive(Debug)]
pub enum Outcome {
    Annotated {
        text: String,
        source: AnnotationSource,
    },
    /// Row had no text.
    SkippedMissingText,
    /// Row's scene label selects no prompt.
    UnrecognizedLabel(String),
    /// The retry policy gave up.
    Failed(AnnoError),
}

impl Outcome {
    /// The annotation text, if one was produced.
    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Annotated { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Produces a tag string for one row.
pub struct Annotator {
    client: Arc<dyn CompletionClient>,
    prompts: Prompts,
    model: String,
    temperature: f32,
    max_tokens: u32,
    policy: RetryPolicy,
    validator: Option<TagValidator>,
}

impl Annotator {
    /// Create an annotator using the given client and model parameters.
    pub fn new(client: Arc<dyn CompletionClient>, prompts: Prompts, settings: &ModelSettings) -> Self {
        Self {
            client,
            prompts,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            policy: RetryPolicy::default(),
            validator: None,
        }
    }

    /// Replace the default (never give up, 30s pause) retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Log a warning when a model reply breaks the tag format.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validator = enabled.then(TagValidator::new);
        self
    }

    /// Build the remote request for a text of the given frame type.
    pub fn request_for(&self, label: SceneLabel, text: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system: self.prompts.system_for(label).to_string(),
            user: text.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Annotate one row.
    #[instrument(skip(self, row), fields(row = row.number))]
    pub async fn annotate(&self, row: &Row) -> Outcome {
        let Some(text) = row.cleaned_text.as_deref() else {
            return Outcome::SkippedMissingText;
        };

        if !row.ocr_accepted {
            return Outcome::Annotated {
                text: tag_all_outside(text),
                source: AnnotationSource::RejectedOcr,
            };
        }

        let label: SceneLabel = match row.scene_label.parse() {
            Ok(label) => label,
            Err(_) => return Outcome::UnrecognizedLabel(row.scene_label.clone()),
        };

        let request = self.request_for(label, text);
        let client = &self.client;
        let request = &request;

        let result = self
            .policy
            .run(|attempt| async move {
                debug!("Calling {} ({} frame, attempt {})", client.name(), label, attempt);
                client.complete(request).await
            })
            .await;

        match result {
            Ok(annotation) => {
                if let Some(validator) = &self.validator {
                    for issue in validator.validate(&annotation, Some(text)) {
                        warn!("Row {}: {}", row.number, issue);
                    }
                }
                Outcome::Annotated {
                    text: annotation,
                    source: AnnotationSource::Model,
                }
            }
            Err(e) => Outcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedClient;
    use crate::retry::Backoff;
    use std::time::Duration;
    use tokio::time::Instant;

    fn annotator(client: Arc<ScriptedClient>) -> Annotator {
        Annotator::new(client, Prompts::default(), &ModelSettings::default())
    }

    #[tokio::test]
    async fn test_rejected_ocr_skips_remote_call() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let annotator = annotator(client.clone());
        let row = Row::new(Some("a b c"), false, "credit");

        let first = annotator.annotate(&row).await;
        let second = annotator.annotate(&row).await;

        assert_eq!(first.text(), Some("a@O b@O c@O"));
        assert_eq!(first.text(), second.text());
        assert!(matches!(
            first,
            Outcome::Annotated {
                source: AnnotationSource::RejectedOcr,
                ..
            }
        ));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_reply_passes_through_verbatim() {
        let reply = "Stanley@BF:1 Kubrick@IF:1 Director@BR:1";
        let client = Arc::new(ScriptedClient::replying(reply));
        let annotator = annotator(client.clone()).with_validation(true);
        let row = Row::new(
            Some("Stanley Kubrick Writer Director of The Shining"),
            true,
            "chyron",
        );

        let outcome = annotator.annotate(&row).await;
        assert_eq!(outcome.text(), Some(reply));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user, "Stanley Kubrick Writer Director of The Shining");
        assert_eq!(requests[0].model, "claude-3-haiku-20240307");
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 100);
        assert!(requests[0].system.contains("The frame type is CHYRON"));
    }

    #[tokio::test]
    async fn test_credit_label_selects_credit_prompt() {
        let client = Arc::new(ScriptedClient::replying("Director@BR:1"));
        let annotator = annotator(client.clone());

        annotator.annotate(&Row::new(Some("Director"), true, "credit")).await;

        assert!(client.requests()[0].system.contains("The frame type is CREDIT"));
    }

    #[tokio::test]
    async fn test_unrecognized_label_is_reported() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let annotator = annotator(client.clone());

        let outcome = annotator.annotate(&Row::new(Some("BREAKING NEWS"), true, "slate")).await;

        assert!(matches!(outcome, Outcome::UnrecognizedLabel(ref l) if l == "slate"));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_text_is_skipped() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let outcome = annotator(client.clone())
            .annotate(&Row::new(None, true, "chyron"))
            .await;

        assert!(matches!(outcome, Outcome::SkippedMissingText));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_after_fixed_pause() {
        let client = Arc::new(
            ScriptedClient::replying("unused")
                .then_fail(529)
                .then_fail(500)
                .then_reply("CLARENCE@BF:1 PAGE@IF:1"),
        );
        let annotator = annotator(client.clone());
        let started = Instant::now();

        let outcome = annotator
            .annotate(&Row::new(Some("CLARENCE PAGE"), true, "chyron"))
            .await;

        assert_eq!(outcome.text(), Some("CLARENCE@BF:1 PAGE@IF:1"));
        assert_eq!(client.calls(), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(60) && waited < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_reports_failure() {
        let client = Arc::new(
            ScriptedClient::replying("unused")
                .then_fail(503)
                .then_fail(503),
        );
        let annotator = annotator(client.clone())
            .with_policy(RetryPolicy::bounded(2, Backoff::Fixed(Duration::from_secs(1))));

        let outcome = annotator
            .annotate(&Row::new(Some("CLARENCE PAGE"), true, "chyron"))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(AnnoError::RetriesExhausted { attempts: 2, .. })
        ));
    }

    #[test]
    fn test_scene_label_parse() {
        assert_eq!("chyron".parse::<SceneLabel>().unwrap(), SceneLabel::Chyron);
        assert_eq!(" Credit ".parse::<SceneLabel>().unwrap(), SceneLabel::Credit);
        assert!("other".parse::<SceneLabel>().is_err());
    }
}
