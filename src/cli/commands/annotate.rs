//! Annotate command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Provider, Settings};
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the annotate command.
pub async fn run_annotate(
    input_file: &str,
    output_dir: Option<String>,
    keep_input: bool,
    provider: Option<String>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(dir) = output_dir {
        settings.storage.output_dir = dir;
    }
    if keep_input {
        settings.storage.delete_input = false;
    }
    if let Some(provider) = provider {
        settings.model.provider = provider.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(model) = model {
        settings.model.model = model;
    }

    if settings.model.provider == Provider::OpenAI && settings.model.model.starts_with("claude") {
        Output::warning(&format!(
            "Model '{}' looks like an Anthropic model but the provider is openai. Use --model.",
            settings.model.model
        ));
    }

    let input = Settings::expand_path(input_file);

    // Pre-flight checks
    if let Err(e) = preflight::check_annotate(settings.model.provider, &input) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if settings.retry.to_policy()?.is_unbounded() {
        Output::info(&format!(
            "Failed calls are retried every {}s until they succeed (Ctrl-C to stop).",
            settings.retry.delay_seconds
        ));
    }

    Output::info(&format!("Annotating: {}", input.display()));

    let pipeline = Pipeline::new(settings)?.with_progress(true);

    match pipeline.run(&input).await {
        Ok(summary) => {
            let stats = &summary.stats;
            Output::success(&format!(
                "Annotated {} rows -> {}",
                stats.output_rows(),
                summary.output_path.display()
            ));
            Output::kv("Input rows", &stats.input_rows.to_string());
            Output::kv("Dropped (no text)", &stats.dropped_missing_text.to_string());
            Output::kv("Model annotations", &stats.model_annotated.to_string());
            Output::kv("Rejected OCR", &stats.rejected_ocr.to_string());
            if summary.input_deleted {
                Output::kv("Input", "removed");
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to annotate: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
