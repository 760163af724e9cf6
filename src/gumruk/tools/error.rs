use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads, flattens, or emits customs documents.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the input is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Raised when the bytes of a document do not match its declared encoding.
    #[error("cannot decode document as {0}")]
    Encoding(String),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a required section cannot be located in a document.
    #[error("missing section {sheet} at path '{path}'")]
    MissingSection { sheet: String, path: String },

    /// Raised when a row does not share the tag layout of the first row.
    #[error(
        "row {row} of section {section} does not match the first row: expected {expected:?}, found {found:?}"
    )]
    ShapeMismatch {
        section: String,
        row: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Raised when a document matches none of the known layouts.
    #[error("unrecognised document with root element '{0}'")]
    UnknownDocument(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
