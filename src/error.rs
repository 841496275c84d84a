use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("METASPACE request failed: {0}")]
    MetaspaceHttp(String),

    #[error("METASPACE returned status {status}: {message}")]
    MetaspaceStatus { status: u16, message: String },

    #[error("METASPACE GraphQL error: {0}")]
    GraphQl(String),

    #[error("dataset record is missing required field: {0}")]
    MissingField(String),

    #[error("invalid pattern {pattern:?}: {message}")]
    #[diagnostic(help("patterns use Rust regex syntax and are matched anywhere in the value"))]
    InvalidPattern { pattern: String, message: String },

    #[error("filter stage {field} does not take {kind} candidates")]
    StageKind {
        field: &'static str,
        kind: &'static str,
    },

    #[error("invalid polarity: {0} (expected positive or negative)")]
    InvalidPolarity(String),

    #[error("dataset not found in table: {0}")]
    DatasetNotFound(String),

    #[error("missing config file metaspace-fetch.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
