//! Low level readers shared by the spreadsheet module.

pub(crate) mod reader;
pub(crate) mod xml;
pub(crate) mod zip;
