//! Sheet model and its CSV form.

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use ledgerdesk_core::DomainError;

/// One named sheet: a header row plus string rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Index of the first header matching any alias (case and spacing ignored).
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            let wanted = normalize(alias);
            self.headers.iter().position(|h| normalize(h) == wanted)
        })
    }

    /// Trimmed cell value; missing or blank cells are `None`.
    pub fn cell<'a>(&self, row: &'a [String], column: Option<usize>) -> Option<&'a str> {
        column
            .and_then(|idx| row.get(idx))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Parse CSV text; the first record is the header row.
    pub fn from_csv(name: impl Into<String>, text: &str) -> Result<Self, DomainError> {
        let name = name.into();
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut records = rdr.records();
        let headers = match records.next() {
            Some(rec) => rec
                .map_err(|e| csv_error(&name, e))?
                .iter()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };

        let mut rows = Vec::new();
        for rec in records {
            let rec = rec.map_err(|e| csv_error(&name, e))?;
            if rec.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(rec.iter().map(str::to_string).collect());
        }

        Ok(Self { name, headers, rows })
    }

    pub fn to_csv(&self) -> Result<String, DomainError> {
        let mut wrt = WriterBuilder::new().flexible(true).from_writer(Vec::new());
        wrt.write_record(&self.headers)
            .map_err(|e| csv_error(&self.name, e))?;
        for row in &self.rows {
            wrt.write_record(row).map_err(|e| csv_error(&self.name, e))?;
        }
        let bytes = wrt
            .into_inner()
            .map_err(|e| DomainError::validation(format!("sheet '{}': {e}", self.name)))?;
        String::from_utf8(bytes)
            .map_err(|e| DomainError::validation(format!("sheet '{}': {e}", self.name)))
    }
}

/// A named set of sheets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, aliases: &[&str]) -> Option<&Sheet> {
        aliases.iter().find_map(|alias| {
            let wanted = normalize(alias);
            self.sheets.iter().find(|s| normalize(&s.name) == wanted)
        })
    }
}

fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn csv_error(sheet: &str, err: csv::Error) -> DomainError {
    DomainError::validation(format!("sheet '{sheet}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_skips_blank_rows() {
        let sheet = Sheet::from_csv("Ledger", "Ledger Name, Under\nCash,Cash-in-Hand\n,\nHDFC,Bank Accounts,extra\n").unwrap();
        assert_eq!(sheet.headers, vec!["Ledger Name", "Under"]);
        assert_eq!(sheet.rows.len(), 2);

        let name = sheet.column(&["Name", "Ledger Name"]);
        assert_eq!(name, Some(0));
        assert_eq!(sheet.cell(&sheet.rows[1], name), Some("HDFC"));
        assert_eq!(sheet.cell(&sheet.rows[0], sheet.column(&["GSTIN"])), None);
    }

    #[test]
    fn quotes_cells_with_commas() {
        let mut sheet = Sheet::new("Vouchers", &["Ledger", "Narration"]);
        sheet.push_row(vec!["Cash".into(), "rent, april".into()]);
        let text = sheet.to_csv().unwrap();
        assert_eq!(text, "Ledger,Narration\nCash,\"rent, april\"\n");
        assert_eq!(Sheet::from_csv("Vouchers", &text).unwrap(), sheet);
    }

    #[test]
    fn sheet_lookup_ignores_case_and_spacing() {
        let book = Workbook::new(vec![Sheet::new("Party Ledger", &["Name"])]);
        assert!(book.sheet(&["party ledger"]).is_some());
        assert!(book.sheet(&["Parties", "PartyLedger"]).is_some());
        assert!(book.sheet(&["Transactions"]).is_none());
    }
}
