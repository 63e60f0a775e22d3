//! Minimal CSV reader for the numeric datasets dmkit consumes.
//!
//! Input files are plain comma-separated tables with a header row and no
//! embedded commas, so quoting is only stripped from individual fields.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::{DmError, Result};

/// A parsed CSV document: header plus data records
#[derive(Debug, Clone)]
pub struct CsvDocument {
    pub header: Vec<String>,
    pub records: Vec<Record>,
}

/// One data row, remembering its 1-based line number for error reporting
#[derive(Debug, Clone)]
pub struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

impl Record {
    /// Parse field `idx` into `T`
    pub fn parse<T>(&self, idx: usize) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .fields
            .get(idx)
            .ok_or_else(|| DmError::parse(self.line, format!("missing field {idx}")))?;
        raw.parse::<T>()
            .map_err(|e| DmError::parse(self.line, format!("invalid value '{raw}': {e}")))
    }
}

impl CsvDocument {
    /// Parse a whole document. Blank lines are skipped.
    pub fn parse(input: &str) -> Result<Self> {
        let mut lines = input
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (_, header_line) = lines
            .next()
            .ok_or_else(|| DmError::Data("CSV input is empty".to_string()))?;
        let header: Vec<String> = split_fields(header_line);

        let mut records = Vec::new();
        for (line, text) in lines {
            let fields = split_fields(text);
            if fields.len() != header.len() {
                return Err(DmError::parse(
                    line,
                    format!("expected {} fields, found {}", header.len(), fields.len()),
                ));
            }
            records.push(Record { line, fields });
        }

        Ok(Self { header, records })
    }

    /// Position of a named column in the header
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DmError::Data(format!("missing column '{name}'")))
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(',')
        .map(|f| f.trim().trim_matches('"').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_and_records() {
        let doc = CsvDocument::parse("a,b\n1,2\n\n3,4\n").unwrap();
        assert_eq!(doc.header, vec!["a", "b"]);
        assert_eq!(doc.records.len(), 2);
        assert_eq!(doc.records[1].line, 4);
        assert_eq!(doc.records[1].parse::<u32>(0).unwrap(), 3);
    }

    #[test]
    fn test_quoted_header() {
        let doc = CsvDocument::parse("\"s\",\"a\"\n1,2\n").unwrap();
        assert_eq!(doc.column_index("a").unwrap(), 1);
    }

    #[test]
    fn test_field_count_mismatch() {
        let err = CsvDocument::parse("a,b\n1\n").unwrap_err();
        assert!(matches!(err, DmError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_empty_input() {
        assert!(CsvDocument::parse("\n\n").is_err());
    }

    #[test]
    fn test_invalid_number() {
        let doc = CsvDocument::parse("a\nx\n").unwrap();
        assert!(doc.records[0].parse::<u32>(0).is_err());
    }
}
