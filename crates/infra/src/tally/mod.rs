//! Tally-compatible workbook import and export.
//!
//! Workbooks travel as `.xlsx` files, or as one CSV document per sheet.
//! Column headers are matched loosely so sheets exported from Tally (or
//! edited by hand) import without renaming.

mod columns;
mod export;
mod import;
mod workbook;
mod xlsx;

pub use columns::{group_for_subtype, subtype_for_group};
pub use export::ExportKind;
pub use import::{ImportIssue, ImportReport};
pub use workbook::{Sheet, Workbook};
pub use xlsx::CONTENT_TYPE as XLSX_CONTENT_TYPE;
