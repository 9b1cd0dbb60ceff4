//! Workbook files (`.xlsx`) for the sheet model.
//!
//! Reading goes through calamine and writing through rust_xlsxwriter. Cells
//! are written as text so amounts keep their exact decimal digits; numbers
//! and dates typed in by hand are read back as their plain text form.

use std::io::Cursor;

use calamine::{Data, DataType, Reader, Xlsx, open_workbook_from_rs};

use ledgerdesk_core::{DomainError, DomainResult};

use super::workbook::{Sheet, Workbook};

pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn xlsx_error(err: impl core::fmt::Display) -> DomainError {
    DomainError::validation(format!("invalid xlsx workbook: {err}"))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_date() {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => cell.to_string(),
        },
        Data::DurationIso(s) => s.clone(),
    }
}

impl Workbook {
    /// Every worksheet, in file order. The first non-empty row of a sheet is
    /// its header; blank rows are dropped.
    pub fn from_xlsx(bytes: &[u8]) -> DomainResult<Self> {
        let mut file: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).map_err(xlsx_error)?;

        let mut sheets = Vec::new();
        for name in file.sheet_names() {
            let range = file.worksheet_range(&name).map_err(xlsx_error)?;
            let mut rows = range
                .rows()
                .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
                .filter(|row| row.iter().any(|c| !c.is_empty()));
            let headers = rows.next().unwrap_or_default();
            sheets.push(Sheet {
                name,
                headers,
                rows: rows.collect(),
            });
        }
        Ok(Workbook::new(sheets))
    }

    pub fn to_xlsx(&self) -> DomainResult<Vec<u8>> {
        let mut file = rust_xlsxwriter::Workbook::new();
        for sheet in &self.sheets {
            let worksheet = file.add_worksheet();
            worksheet.set_name(&sheet.name).map_err(xlsx_error)?;
            let lines = core::iter::once(&sheet.headers).chain(&sheet.rows);
            for (r, line) in lines.enumerate() {
                let r = u32::try_from(r).map_err(|_| xlsx_error(format!("sheet '{}' has too many rows", sheet.name)))?;
                for (c, value) in line.iter().enumerate() {
                    let c = u16::try_from(c)
                        .map_err(|_| xlsx_error(format!("sheet '{}' has too many columns", sheet.name)))?;
                    worksheet.write_string(r, c, value).map_err(xlsx_error)?;
                }
            }
        }
        file.save_to_buffer().map_err(xlsx_error)
    }
}
