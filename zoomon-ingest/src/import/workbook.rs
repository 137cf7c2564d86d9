//! Workbook loading
//!
//! Parses spreadsheet bytes into ordered sheets of text rows. Every cell is
//! coerced to trimmed text at this boundary; typed parsing happens later in
//! the fact transformers.

use crate::error::ImportError;
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

/// One sheet: an ordered sequence of rows of cell text
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Header row, if the sheet has one
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// All rows after the header
    pub fn data_rows(&self) -> &[Vec<String>] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }
}

/// A parsed workbook: ordered collection of sheets
#[derive(Debug, Clone)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Parse xlsx bytes into text rows
    pub fn from_bytes(bytes: &[u8]) -> Result<Workbook, ImportError> {
        if bytes.is_empty() {
            return Err(ImportError::MissingInput);
        }

        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| ImportError::Format(e.to_string()))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names().to_vec() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ImportError::Format(format!("sheet '{}': {}", name, e)))?;
            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_text).collect())
                .collect();
            sheets.push(Sheet { name, rows });
        }

        Ok(Workbook { sheets })
    }

    /// The single data sheet of an import file: the first sheet, which must
    /// have at least one data row after the header
    pub fn data_sheet(&self) -> Result<&Sheet, ImportError> {
        let sheet = self
            .sheets
            .first()
            .ok_or_else(|| ImportError::Format("workbook has no sheets".to_string()))?;
        if sheet.data_rows().is_empty() {
            return Err(ImportError::EmptyInput(sheet.name.clone()));
        }
        Ok(sheet)
    }
}

/// Coerce one cell to text; blank cells become the empty string
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}
