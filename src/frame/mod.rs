use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::info;
use regex::Regex;


/// A single cell in a tabular dataset.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Missing,
}

impl Value {
    pub(crate) fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// String form used for CSV output and table display. Missing cells
    /// render as an empty string.
    pub(crate) fn display(&self) -> String {
        match self {
            Value::Number(n) => format!("{}", n),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Text(s) => s.clone(),
            Value::Missing => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    FileNotFound(String),
    InvalidFile(String),
    MissingColumn(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "frame error: {}",
            match self {
                FrameError::FileNotFound(s) => s,
                FrameError::InvalidFile(s) => s,
                FrameError::MissingColumn(s) => s,
            }
        )
    }
}

impl std::error::Error for FrameError {}

/// An in-memory table of rows by named columns. Every dataset in this
/// crate passes through one of these between file read and file write.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Value>>,
}

impl Frame {
    pub(crate) fn new(columns: Vec<String>) -> Frame {
        Frame { columns, rows: vec![] }
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub(crate) fn require_column(&self, name: &str) -> Result<usize, FrameError> {
        self.column_index(name)
            .ok_or_else(|| FrameError::MissingColumn(format!("Unable to locate '{}' column", name)))
    }

    /// Median over the Number cells of a column, ignoring everything else.
    /// Even counts average the two middle values.
    pub(crate) fn median(&self, column: usize) -> Option<f64> {
        let mut values: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|row| match row[column] {
                Value::Number(n) if n.is_finite() => Some(n),
                _ => None,
            })
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            Some(values[mid])
        } else {
            Some((values[mid - 1] + values[mid]) / 2.0)
        }
    }

    /// Key identifying a row by its full contents, used for exact-duplicate
    /// detection. Cells carry a type tag so Text("5") and Number(5.0) never
    /// collide.
    pub(crate) fn row_key(row: &[Value]) -> String {
        let mut key = String::new();
        for cell in row {
            match cell {
                Value::Number(n) => {
                    key.push('n');
                    key.push_str(&format!("{:?}", n));
                }
                Value::Date(d) => {
                    key.push('d');
                    key.push_str(&d.format("%Y-%m-%d").to_string());
                }
                Value::Text(s) => {
                    key.push('t');
                    key.push_str(s);
                }
                Value::Missing => key.push('m'),
            }
            key.push('\x1f');
        }
        key
    }
}

pub(crate) fn read_csv(file_path: &Path) -> Result<Frame, FrameError> {
    if !file_path.exists() {
        return Err(FrameError::FileNotFound(format!("File not found: {}", file_path.display())));
    }

    info!("Reading {}", file_path.display());
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(file_path)
        .map_err(|e| FrameError::InvalidFile(e.to_string()))?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| FrameError::InvalidFile(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(FrameError::InvalidFile("File has no header row".to_string()));
    }

    let mut frame = Frame::new(headers);
    let mut record = StringRecord::new();
    loop {
        match rdr.read_record(&mut record) {
            Ok(true) => {
                let mut row: Vec<Value> = Vec::with_capacity(frame.columns.len());
                for i in 0..frame.columns.len() {
                    row.push(match record.get(i) {
                        None | Some("") => Value::Missing,
                        Some(s) => Value::Text(s.to_string()),
                    });
                }
                frame.rows.push(row);
            }
            Ok(false) => break,
            Err(e) => return Err(FrameError::InvalidFile(e.to_string())),
        }
    }

    info!("Read {} rows, {} columns", frame.rows.len(), frame.columns.len());
    Ok(frame)
}

pub(crate) fn write_csv(frame: &Frame, file_path: &Path) -> Result<(), FrameError> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(file_path)
        .map_err(|e| FrameError::InvalidFile(e.to_string()))?;

    writer
        .write_record(&frame.columns)
        .map_err(|e| FrameError::InvalidFile(e.to_string()))?;
    for row in &frame.rows {
        let record: Vec<String> = row.iter().map(Value::display).collect();
        writer
            .write_record(&record)
            .map_err(|e| FrameError::InvalidFile(e.to_string()))?;
    }
    writer.flush().map_err(|e| FrameError::InvalidFile(e.to_string()))?;
    Ok(())
}

/// Parse a date cell in any of the formats seen in exported statements.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let yyyymmdd = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    let yyyymmdd_hhmmss = Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}$").unwrap();
    let ddmmyyyy = Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap();
    let ddmmmyyyy = Regex::new(r"^\d{1,2} [a-zA-Z]{3} \d{4}$").unwrap();

    let s = s.trim();
    if yyyymmdd.is_match(s) {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    } else if yyyymmdd_hhmmss.is_match(s) {
        NaiveDate::parse_from_str(&s[0..10], "%Y-%m-%d").ok()
    } else if ddmmyyyy.is_match(s) {
        NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
    } else if ddmmmyyyy.is_match(s) {
        NaiveDate::parse_from_str(s, "%d %b %Y").ok()
    } else {
        None
    }
}
