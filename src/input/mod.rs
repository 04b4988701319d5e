use std::path::Path;

use thiserror::Error;

pub mod reader;
pub mod table;

use reader::{detect_delimiter, open_maybe_gz};
pub use table::{Column, ColumnData, SampleTable};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<csv::Error> for InputError {
    fn from(value: csv::Error) -> Self {
        InputError::Parse(value.to_string())
    }
}

/// Reads a delimited event table. A column is numeric when every cell parses as a float;
/// columns listed in `drop` are removed after typing.
pub fn load_sample_table(path: &Path, drop: &[String]) -> Result<SampleTable, InputError> {
    let delimiter = detect_delimiter(path);
    let source = open_maybe_gz(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let header = reader
        .headers()?
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    if header.is_empty() || header.iter().all(|h| h.is_empty()) {
        return Err(InputError::Parse(format!(
            "{} has an empty header",
            path.display()
        )));
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); header.len()];
    for (line_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            InputError::InvalidInput(format!("row {} is not rectangular: {}", line_no + 2, e))
        })?;
        for (col, field) in record.iter().enumerate() {
            cells[col].push(field.to_string());
        }
    }

    let n_rows = cells.first().map(|c| c.len()).unwrap_or(0);
    let mut table = SampleTable::new(n_rows);
    for (name, raw) in header.iter().zip(cells) {
        match parse_numeric(&raw) {
            Some(values) => table.push_numeric(name, values)?,
            None => table.push_text(name, raw)?,
        }
    }

    let dropped = table.drop_columns(drop);
    tracing::info!(
        path = %path.display(),
        n_cells = table.n_rows,
        n_columns = table.n_cols(),
        dropped = ?dropped,
        "loaded sample table"
    );
    Ok(table)
}

fn parse_numeric(raw: &[String]) -> Option<Vec<f64>> {
    let mut out = Vec::with_capacity(raw.len());
    for value in raw {
        out.push(value.parse::<f64>().ok()?);
    }
    Some(out)
}

pub fn default_sample_id(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "sample".to_string());
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
