use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StressError {
    #[error("input not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid source pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("unsupported source kind: {}", path.display())]
    UnsupportedSource { path: PathBuf },

    #[error("required column `{0}` is missing")]
    MissingColumn(String),

    #[error("column layout of {} differs from the first matched file", path.display())]
    SchemaMismatch { path: PathBuf },

    #[error("cannot parse `{value}` in column `{column}` at row {row}")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },
}

pub type Result<T, E = StressError> = std::result::Result<T, E>;
