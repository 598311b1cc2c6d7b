use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("no cell at row {row}, column {column}")]
    NoCell { row: usize, column: usize },

    #[error("no free cell found after {probes} probes starting at row {row}, column {column}")]
    PlacementExhausted {
        row: usize,
        column: usize,
        probes: usize,
    },
}

pub type Result<T> = std::result::Result<T, ExploreError>;
