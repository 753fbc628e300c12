//! # Spreadsheet Reading Module
//!
//! Reads Office Open XML workbooks (.xlsx, .xlsm, .xltx, .xltm): sheet list,
//! cell values and formulas, merged ranges and the style tables needed to
//! inspect how cells are formatted.

pub mod cell;
pub mod criteria;
pub(crate) mod formula;
pub mod reference;
pub mod sheet;
pub mod styles;
pub mod xlsx;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::helpers::reader::UnifiedReader;
pub use cell::Cell;
pub use cell::CellType;
pub use criteria::Criteria;
pub use sheet::Sheet;
pub use styles::CellStyle;
pub use styles::Styles;
pub use xlsx::Workbook;

use thiserror::Error;

/// Errors raised while opening or reading a workbook
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// File extension outside the xlsx family
    #[error("Unsupported file format '{0}', expected .xlsx, .xlsm, .xltx or .xltm")]
    UnsupportedFormat(String),

    /// Encrypted package stored in an OLE2 container
    #[error("Workbook '{0}' is password protected")]
    PasswordProtected(String),

    #[error("Workbook '{0}' contains no worksheet")]
    EmptyWorkbook(String),

    /// A part referenced by the package is absent
    #[error("Missing part '{0}' in workbook")]
    MissingPart(String),

    #[error("Worksheet named '{0}' not found")]
    SheetNotFound(String),

    /// Shared string cell pointing outside the shared string table
    #[error("Invalid shared string index '{2}' at {0}!{1}")]
    SharedStringIndex(String, String, String),
}
