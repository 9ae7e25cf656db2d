use std::io;

use thiserror::Error;

/// Every failure the pipeline can surface to a caller.
///
/// Row-level problems (unparsable dates, non-numeric engagement) never show up
/// here; they degrade to null or zero inside the stage that meets them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("workbook error: {0}")]
    Workbook(String),
    #[error("sheet '{0}' not found in workbook")]
    SheetNotFound(String),
    #[error("optional sheet '{sheet}' unavailable: {reason}")]
    OptionalSheetMissing { sheet: String, reason: String },
    #[error("sheet '{sheet}' has no header row after {preamble_rows} preamble rows")]
    MissingHeader { sheet: String, preamble_rows: usize },
    #[error("required column '{0}' is missing")]
    MissingColumn(String),
    #[error("macrotheme {theme} references unknown tag column '{column}'")]
    UnknownTagColumn { theme: u8, column: String },
    #[error("outputs of '{file}' would overwrite those of '{other}'")]
    OutputCollision { file: String, other: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
