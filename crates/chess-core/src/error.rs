use thiserror::Error;

/// A move the board cursor refused to apply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal move {san} at ply {ply}: {reason}")]
pub struct IllegalMove {
    pub ply: u32,
    pub san: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessCoreError {
    #[error("Invalid start position: {0}")]
    InvalidStartPosition(String),

    #[error(transparent)]
    IllegalMove(#[from] IllegalMove),
}
