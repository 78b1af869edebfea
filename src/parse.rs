use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::num::ParseFloatError;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("line {line}: column '{column}' is not a number: '{value}'")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("{0}")]
    InvalidInput(String),
}

/// A CSV file read fully into memory whose columns are addressed by header name.
///
/// Cells are kept as written, so `" A"` and `"A"` are different names. Every
/// record must have as many fields as the header.
#[derive(Debug, Clone)]
pub struct Table {
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self, ParseError> {
        flame::span_of("parse", || -> Result<Self, ParseError> {
            let mut reader = ReaderBuilder::new().from_reader(input);
            let headers = reader.headers()?.clone();
            if headers.is_empty() {
                return Err(ParseError::InvalidInput("Missing header row".to_string()));
            }
            let records = reader.records().collect::<Result<Vec<_>, _>>()?;
            log::debug!("read {} rows with columns {:?}", records.len(), headers);
            Ok(Table { headers, records })
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    /// Index of the column called `name`.
    pub fn column(&self, name: &str) -> Result<usize, ParseError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| ParseError::MissingColumn(name.to_string()))
    }

    /// Cells of one column, in row order.
    pub fn text(&self, column: usize) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .map(move |record| record.get(column).unwrap_or(""))
    }

    /// Cells of one column parsed as floating point numbers. Surrounding
    /// whitespace is allowed around a number.
    pub fn numbers(&self, column: usize) -> Result<Vec<f64>, ParseError> {
        self.text(column)
            .enumerate()
            .map(|(row, value)| {
                value.trim().parse::<f64>().map_err(|source| ParseError::InvalidNumber {
                    // +1 for the header, +1 for 1-based lines
                    line: row + 2,
                    column: self.headers.get(column).unwrap_or("").to_string(),
                    value: value.to_string(),
                    source,
                })
            })
            .collect()
    }
}

#[test]
fn test_columns_are_found_by_name() {
    let table = Table::from_reader("name,bk_primal\nA, 1.5\nB,2 \n".as_bytes()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.column("bk_primal").unwrap(), 1);
    let names: Vec<&str> = table.text(0).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(table.numbers(1).unwrap(), vec![1.5, 2.0]);
}

#[test]
fn test_text_cells_are_not_trimmed() {
    let table = Table::from_reader("name , cost\n A,1\nA,2\n".as_bytes()).unwrap();
    let names: Vec<&str> = table.text(0).collect();
    assert_eq!(names, vec![" A", "A"]);
    assert!(matches!(table.column("cost"), Err(ParseError::MissingColumn(_))));
    assert_eq!(table.column(" cost").unwrap(), 1);
}

#[test]
fn test_missing_column() {
    let table = Table::from_reader("name,value\nA,1\n".as_bytes()).unwrap();
    match table.column("class_name") {
        Err(ParseError::MissingColumn(column)) => assert_eq!(column, "class_name"),
        other => panic!("expected a missing column, got {:?}", other),
    }
}

#[test]
fn test_invalid_number_reports_line() {
    let table = Table::from_reader("name,cost\nA,1\nB,abc\n".as_bytes()).unwrap();
    match table.numbers(1) {
        Err(ParseError::InvalidNumber { line, column, value, .. }) => {
            assert_eq!(line, 3);
            assert_eq!(column, "cost");
            assert_eq!(value, "abc");
        }
        other => panic!("expected an invalid number, got {:?}", other),
    }
}

#[test]
fn test_ragged_rows_are_rejected() {
    assert!(matches!(
        Table::from_reader("name,cost\nA,1,2\n".as_bytes()),
        Err(ParseError::Csv(_))
    ));
}

#[test]
fn test_header_only_table_is_empty() {
    let table = Table::from_reader("name,cost\n".as_bytes()).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.headers().collect::<Vec<_>>(), vec!["name", "cost"]);
}
