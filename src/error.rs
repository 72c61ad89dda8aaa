//! Error types for the benchmark harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that can occur while preparing, running, or summarizing benchmark runs.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Required external executable could not be located
    #[error("Tool not found: {0}. Install the cactus/jobTree utilities or set CACTUS_BIN_DIR.")]
    ToolNotFound(String),

    /// An external tool exited with a non-zero status
    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: String, stderr: String },

    /// The workflow did not run to completion according to jobTreeStatus
    #[error("Workflow incomplete in {0}")]
    WorkflowIncomplete(PathBuf),

    /// An XML document did not have the expected shape
    #[error("Unexpected XML shape in {path}: {detail}")]
    XmlShape { path: PathBuf, detail: String },

    /// Low-level XML parse error
    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Malformed XML attribute
    #[error("XML attribute error: {0}")]
    XmlAttrError(#[from] quick_xml::events::attributes::AttrError),

    /// Invalid parameter combination
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Unrecognized strategy or axis value
    #[error("Unknown value {value:?} for {axis}")]
    UnknownValue { axis: &'static str, value: String },

    /// A MAF sequence name had no entry in the naming map
    #[error("No renaming entry for MAF sequence {0:?}")]
    UnknownSequence(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Manifest (de)serialization error
    #[error("Manifest error: {0}")]
    ManifestError(#[from] serde_json::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}
