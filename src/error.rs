// Fatal errors for a pipeline run.
//
// Anything in here aborts the run. Data-quality problems are reported
// through [`crate::diagnostics`] instead and never surface as an `Error`.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// A required input table could not be read.
    #[error("data source error at {}: {message}", path.display())]
    Source { path: PathBuf, message: String },

    /// The configuration file exists but could not be used.
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    pub fn data_source(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Source {
            path: path.into(),
            message: message.into(),
        }
    }
}
