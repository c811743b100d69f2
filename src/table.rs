//! CSV tables of OCR rows.
//!
//! A table carries every input column through unchanged. The three columns the
//! annotator reads are parsed into typed fields on load, and the annotation is
//! written back as an extra column.

use crate::error::{AnnoError, Result};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

pub const TEXT_COLUMN: &str = "cleaned_text";
pub const OCR_ACCEPTED_COLUMN: &str = "ocr_accepted";
pub const SCENE_LABEL_COLUMN: &str = "scene_label";
pub const ANNOTATION_COLUMN: &str = "silver_standard_annotation";

/// One unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based position of the row in the input file (header excluded).
    pub number: usize,
    /// OCR output. None when the cell is empty.
    pub cleaned_text: Option<String>,
    /// Whether OCR recognition is trusted.
    pub ocr_accepted: bool,
    /// Frame type, normally "chyron" or "credit".
    pub scene_label: String,
    /// Annotation, once produced.
    pub annotation: Option<String>,
    fields: Vec<String>,
}

impl Row {
    /// Build a row with only the annotator's columns.
    pub fn new(cleaned_text: Option<&str>, ocr_accepted: bool, scene_label: &str) -> Self {
        Self {
            number: 0,
            cleaned_text: cleaned_text.map(str::to_string),
            ocr_accepted,
            scene_label: scene_label.to_string(),
            annotation: None,
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    text: usize,
    ocr_accepted: usize,
    scene_label: usize,
    annotation: Option<usize>,
}

/// An ordered table of rows sharing one header.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    columns: Columns,
    rows: Vec<Row>,
}

impl Table {
    /// Read a table from a CSV file.
    pub fn read_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a table from CSV data with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require =
            |name: &str| find(name).ok_or_else(|| AnnoError::MissingColumn(name.to_string()));

        let columns = Columns {
            text: require(TEXT_COLUMN)?,
            ocr_accepted: require(OCR_ACCEPTED_COLUMN)?,
            scene_label: require(SCENE_LABEL_COLUMN)?,
            annotation: find(ANNOTATION_COLUMN),
        };

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let number = idx + 1;
            let fields: Vec<String> = record.iter().map(str::to_string).collect();

            let text = &fields[columns.text];
            let accepted = parse_bool(&fields[columns.ocr_accepted]).ok_or_else(|| {
                AnnoError::InvalidValue {
                    row: number,
                    column: OCR_ACCEPTED_COLUMN.to_string(),
                    value: fields[columns.ocr_accepted].clone(),
                }
            })?;

            rows.push(Row {
                number,
                cleaned_text: (!text.is_empty()).then(|| text.clone()),
                ocr_accepted: accepted,
                scene_label: fields[columns.scene_label].trim().to_string(),
                annotation: columns
                    .annotation
                    .map(|i| fields[i].clone())
                    .filter(|a| !a.is_empty()),
                fields,
            });
        }

        debug!("Loaded {} rows", rows.len());
        Ok(Self {
            headers,
            columns,
            rows,
        })
    }

    /// Build a table from rows that were not read from a file.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut row)| {
                row.number = idx + 1;
                row.fields = vec![
                    row.cleaned_text.clone().unwrap_or_default(),
                    if row.ocr_accepted { "True" } else { "False" }.to_string(),
                    row.scene_label.clone(),
                ];
                row
            })
            .collect();

        Self {
            headers: vec![
                TEXT_COLUMN.to_string(),
                OCR_ACCEPTED_COLUMN.to_string(),
                SCENE_LABEL_COLUMN.to_string(),
            ],
            columns: Columns {
                text: 0,
                ocr_accepted: 1,
                scene_label: 2,
                annotation: None,
            },
            rows,
        }
    }

    /// Remove rows with no text. Returns how many were dropped.
    pub fn drop_missing_text(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.cleaned_text.is_some());
        before - self.rows.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV, with the annotation column appended
    /// (or updated in place when the input already had one).
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);

        let mut headers = self.headers.clone();
        if self.columns.annotation.is_none() {
            headers.push(ANNOTATION_COLUMN.to_string());
        }
        writer.write_record(&headers)?;

        for row in &self.rows {
            let mut fields = row.fields.clone();
            let annotation = row.annotation.clone().unwrap_or_default();
            match self.columns.annotation {
                Some(i) => fields[i] = annotation,
                None => fields.push(annotation),
            }
            writer.write_record(&fields)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write the table to `path`, replacing any existing file atomically.
    pub fn write_path(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        self.to_writer(temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| AnnoError::Io(e.error))?;
        Ok(())
    }
}

/// Parse a boolean cell. Empty cells count as true: only an explicit false
/// sends a row down the rejected-OCR path.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "true" | "t" | "1" | "1.0" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "0.0" | "no" | "n" => Some(false),
        _ => None,
    }
}
