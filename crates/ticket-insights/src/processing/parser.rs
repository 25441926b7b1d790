use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};

use crate::error::SourceError;
use crate::storage::TicketSource;

/// Reads ticket rows from a local spreadsheet or CSV export.
///
/// Only the first non-empty worksheet of a workbook is read. Fully empty rows
/// are skipped; cells are rendered to text the way a sheet export shows them.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "csv" => parse_csv(&self.path),
            "xlsx" | "xls" | "ods" | "xlsm" | "xlsb" => parse_spreadsheet(&self.path),
            other => Err(SourceError::Parse(format!(
                "unsupported file type '{}' for {}",
                other,
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl TicketSource for FileSource {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.read_rows())
            .await
            .map_err(|e| SourceError::Parse(format!("reader task failed: {}", e)))?
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

fn parse_spreadsheet(path: &Path) -> Result<Vec<Vec<String>>, SourceError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| SourceError::Workbook(format!("{}: {}", path.display(), e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(SourceError::Workbook(format!(
            "spreadsheet has no sheets: {}",
            path.display()
        )));
    }

    for sheet_name in &sheet_names {
        let range = match workbook.worksheet_range(sheet_name) {
            Ok(r) => r,
            Err(_) => continue,
        };

        if range.is_empty() {
            continue;
        }

        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .collect();
        return Ok(rows);
    }

    Ok(Vec::new())
}

fn parse_csv(path: &Path) -> Result<Vec<Vec<String>>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SourceError::Parse(format!("{}: {}", path.display(), e)))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::Parse(e.to_string()))?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(cells);
    }
    Ok(rows)
}

/// Convert a calamine cell to a clean string representation.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Use integer display when the float is a whole number (e.g. 15.0 → "15")
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                format!("{:.4}", f).trim_end_matches('0').trim_end_matches('.').to_string()
            }
        }
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#ERR:{:?}", e),
        // Serial dates render as ISO text so the date parsers can read them
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(at) => at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => dt.to_string(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}
