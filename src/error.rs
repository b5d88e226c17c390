use thiserror::Error;

/// Errors surfaced by the report library.
///
/// Most of these never reach the user as failures: the session layer turns
/// persistence errors into notices and the exporter skips broken assets.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to decode image: {0}")]
    Image(String),

    #[error("malformed table data: {0}")]
    Table(String),

    #[error("unknown section `{0}`")]
    UnknownSection(String),

    #[error("row {0} does not exist")]
    NoSuchRow(usize),

    #[error("row {0}: the `Total` head is reserved for the totals row")]
    ReservedHead(usize),

    #[error("`{0}` does not name a list in the report")]
    BadTarget(String),
}

pub type Result<T, E = ReportError> = std::result::Result<T, E>;
