use thiserror::Error;

use crate::symbols::SymbolId;

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Invalid reel: {0}")]
    InvalidReel(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(SymbolId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlotError {
    /// True when the caller supplied bad input, false when the engine itself
    /// failed (I/O, serialization of our own output).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SlotError::InvalidReel(_) | SlotError::UnknownSymbol(_) | SlotError::InvalidRequest(_)
        )
    }
}

pub type SlotResult<T> = Result<T, SlotError>;
