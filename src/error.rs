use thiserror::Error;

/// Main error type for the FiscaSync tools.
/// Aggregates errors from various sources including standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum FiscaError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{0}")]
    UrlError(#[from] url::ParseError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Domain module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    AnalysisError(#[from] crate::analysis::AnalysisError),

    #[error("{0}")]
    ClientError(#[from] crate::client::ClientError),

    #[error("{0}")]
    LaunchError(#[from] crate::launcher::LaunchError),
}

pub type Result<T, E = FiscaError> = std::result::Result<T, E>;

pub trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, FiscaError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| FiscaError::WithContextError(format!("{}: {}", message, e)))
    }
}
