//! Validate command implementation.

use crate::cli::output::preview;
use crate::cli::Output;
use crate::config::Settings;
use crate::table::TEXT_COLUMN;
use crate::tags::{Issue, TagValidator};
use anyhow::{Context, Result};

/// Issues found for one row.
#[derive(Debug)]
pub struct RowReport {
    pub row: usize,
    pub annotation: String,
    pub issues: Vec<Issue>,
}

/// Check every non-empty annotation in `column`, comparing against
/// `cleaned_text` when the table has it.
pub fn validate_csv<R: std::io::Read>(
    reader: R,
    column: &str,
) -> Result<(usize, Vec<RowReport>)> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();

    let annotation_idx = headers
        .iter()
        .position(|h| h.trim() == column)
        .with_context(|| format!("Column '{}' not found", column))?;
    let text_idx = headers.iter().position(|h| h.trim() == TEXT_COLUMN);

    let validator = TagValidator::new();
    let mut checked = 0;
    let mut reports = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let annotation = record.get(annotation_idx).unwrap_or_default();
        if annotation.is_empty() {
            continue;
        }
        checked += 1;

        let source = text_idx.and_then(|i| record.get(i));
        let issues = validator.validate(annotation, source);
        if !issues.is_empty() {
            reports.push(RowReport {
                row: idx + 1,
                annotation: annotation.to_string(),
                issues,
            });
        }
    }

    Ok((checked, reports))
}

/// Run the validate command.
pub fn run_validate(input: &str, column: &str) -> Result<()> {
    let path = Settings::expand_path(input);
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let (checked, reports) = validate_csv(file, column)?;

    if checked == 0 {
        Output::warning(&format!("No annotations found in column '{}'", column));
        return Ok(());
    }

    for report in &reports {
        Output::header(&format!("Row {}", report.row));
        println!("  {}", preview(&report.annotation, 120));
        for issue in &report.issues {
            Output::list_item(&issue.to_string());
        }
    }

    println!();
    if reports.is_empty() {
        Output::success(&format!("All {} annotations are well-formed", checked));
        Ok(())
    } else {
        Output::error(&format!(
            "{} of {} annotations have problems",
            reports.len(),
            checked
        ));
        Err(anyhow::anyhow!("{} annotations failed validation", reports.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_csv_reports_bad_rows() {
        let data = "\
cleaned_text,ocr_accepted,scene_label,silver_standard_annotation
Stanley Kubrick Director,True,chyron,Stanley@BF:1 Kubrick@IF:1 Director@BR:1
CLARENCE PAGE,True,chyron,CLARENCE@BF:1 PAGE@IF:1
,True,credit,
a b,False,credit,a@O b@O
";
        let (checked, reports) = validate_csv(data.as_bytes(), "silver_standard_annotation").unwrap();

        assert_eq!(checked, 3);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].row, 2);
        assert_eq!(reports[0].issues, vec![Issue::UnpairedFiller(1)]);
    }

    #[test]
    fn test_validate_csv_missing_column() {
        let data = "cleaned_text\nabc\n";
        assert!(validate_csv(data.as_bytes(), "silver_standard_annotation").is_err());
    }
}
