//! Batch annotation pipeline.
//!
//! Loads a table, drops rows without text, annotates the rest in order, writes
//! the annotated table to the output directory and removes the consumed input.

use crate::annotator::{AnnotationSource, Annotator, Outcome, SceneLabel};
use crate::config::{Prompts, Settings};
use crate::error::{AnnoError, Result};
use crate::llm::create_client;
use crate::table::Table;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Counts for one annotated table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableStats {
    /// Rows read from the input.
    pub input_rows: usize,
    /// Rows dropped because they had no text.
    pub dropped_missing_text: usize,
    /// Rows annotated by the remote model.
    pub model_annotated: usize,
    /// Rows tagged locally because OCR was rejected.
    pub rejected_ocr: usize,
}

impl TableStats {
    pub fn output_rows(&self) -> usize {
        self.model_annotated + self.rejected_ocr
    }
}

/// Result of a full run.
#[derive(Debug)]
pub struct RunSummary {
    pub stats: TableStats,
    /// Where the annotated table was written.
    pub output_path: PathBuf,
    /// Whether the input file was removed.
    pub input_deleted: bool,
}

/// The batch driver.
pub struct Pipeline {
    settings: Settings,
    annotator: Annotator,
    show_progress: bool,
}

impl Pipeline {
    /// Create a pipeline with the client and prompts described by the settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let client = create_client(&settings.model)?;

        info!(
            "Annotating with {} ({})",
            settings.model.model,
            client.name()
        );

        let annotator = Annotator::new(client, prompts, &settings.model)
            .with_policy(settings.retry.to_policy()?)
            .with_validation(settings.pipeline.validate_responses);

        Ok(Self::with_annotator(settings, annotator))
    }

    /// Create a pipeline around an existing annotator.
    pub fn with_annotator(settings: Settings, annotator: Annotator) -> Self {
        Self {
            settings,
            annotator,
            show_progress: false,
        }
    }

    /// Show a progress bar on stderr while annotating.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Output location for an input table: same file name, in the output directory.
    pub fn output_path_for(&self, input: &Path) -> Result<PathBuf> {
        let name = input.file_name().ok_or_else(|| {
            AnnoError::Config(format!("Input path has no file name: {}", input.display()))
        })?;
        Ok(self.settings.output_dir().join(name))
    }

    /// Annotate every row of a table in place.
    ///
    /// Rows without text are removed first. Scene labels are checked before any
    /// remote call so that a bad label does not waste a partially paid run.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub async fn annotate_table(&self, table: &mut Table) -> Result<TableStats> {
        let mut stats = TableStats {
            input_rows: table.len(),
            dropped_missing_text: table.drop_missing_text(),
            ..TableStats::default()
        };
        if stats.dropped_missing_text > 0 {
            info!("Dropped {} rows without text", stats.dropped_missing_text);
        }

        check_scene_labels(table)?;

        let progress = self.progress_bar(table.len() as u64);
        let concurrency = self.settings.pipeline.concurrency.max(1);

        // `buffered` yields in input order with at most `concurrency` rows in
        // flight. `try_collect` stops at the first row that fails, so no further
        // remote calls are made once the run cannot complete.
        let result: Result<Vec<(String, AnnotationSource)>> = stream::iter(table.rows())
            .map(|row| async move { settle(row.number, self.annotator.annotate(row).await) })
            .buffered(concurrency)
            .inspect(|_| progress.inc(1))
            .try_collect()
            .await;

        progress.finish_and_clear();

        for (row, (text, source)) in table.rows_mut().iter_mut().zip(result?) {
            match source {
                AnnotationSource::Model => stats.model_annotated += 1,
                AnnotationSource::RejectedOcr => stats.rejected_ocr += 1,
            }
            row.annotation = Some(text);
        }

        info!(
            "Annotated {} rows ({} by model, {} rejected OCR)",
            stats.output_rows(),
            stats.model_annotated,
            stats.rejected_ocr
        );
        Ok(stats)
    }

    /// Annotate the table at `input`, write the result and consume the input.
    #[instrument(skip(self), fields(input = %input.display()))]
    pub async fn run(&self, input: &Path) -> Result<RunSummary> {
        let mut table = Table::read_path(input)?;
        let output_path = self.output_path_for(input)?;

        let stats = self.annotate_table(&mut table).await?;

        table.write_path(&output_path)?;
        info!("Wrote {}", output_path.display());

        let mut input_deleted = false;
        if self.settings.storage.delete_input {
            if same_file(input, &output_path) {
                warn!("Output replaced the input in place; not deleting it");
            } else {
                std::fs::remove_file(input)?;
                input_deleted = true;
            }
        }

        Ok(RunSummary {
            stats,
            output_path,
            input_deleted,
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Annotating [{bar:30.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    }
}

/// Turn a row outcome into its annotation, or the error that ends the run.
fn settle(number: usize, outcome: Outcome) -> Result<(String, AnnotationSource)> {
    match outcome {
        Outcome::Annotated { text, source } => Ok((text, source)),
        Outcome::Failed(e) => {
            warn!("Row {} failed: {}", number, e);
            Err(e)
        }
        Outcome::UnrecognizedLabel(label) => Err(AnnoError::UnrecognizedLabel(format!(
            "row {}: '{}'",
            number, label
        ))),
        Outcome::SkippedMissingText => Err(AnnoError::Config(format!(
            "row {} reached annotation without text",
            number
        ))),
    }
}

/// Fail on rows whose label selects no prompt. Rejected-OCR rows never reach
/// the model, so their label is not checked.
fn check_scene_labels(table: &Table) -> Result<()> {
    let bad: Vec<String> = table
        .rows()
        .iter()
        .filter(|row| row.ocr_accepted && row.scene_label.parse::<SceneLabel>().is_err())
        .map(|row| format!("row {}: '{}'", row.number, row.scene_label))
        .collect();

    if bad.is_empty() {
        return Ok(());
    }

    const SHOWN: usize = 5;
    let mut message = bad.iter().take(SHOWN).cloned().collect::<Vec<_>>().join(", ");
    if bad.len() > SHOWN {
        message.push_str(&format!(" and {} more", bad.len() - SHOWN));
    }
    Err(AnnoError::UnrecognizedLabel(message))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
