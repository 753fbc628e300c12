//! # FiscaSync Tools
//!
//! Operational tooling around the FiscaSync tax and accounting backend.
//!
//! ## Binaries
//!
//! - `excel-analyzer`: reports the layout of an Excel workbook (dimensions,
//!   merged ranges, formulas, styling clusters, likely headers and tables) as
//!   text and as `<stem>_analysis.json`
//! - `auth-stub`: a development login server handing out fixed tokens
//! - `api-check`: logs in and exercises the read-only TAX and ACCOUNTING
//!   endpoints of a running backend
//! - `start-backend`: migrates, creates the admin account and runs the Django
//!   development server
//!
//! The workbook reader only understands Office Open XML packages (`.xlsx`,
//! `.xlsm`, `.xltx`, `.xltm`).

pub mod analysis;
pub mod client;
pub mod error;
pub(crate) mod helpers;
pub mod launcher;
pub mod logging;
pub mod server;
pub mod spreadsheet;

pub use error::FiscaError;
pub use error::Result;
