// Error taxonomy of the plot engine
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlotError {
    /// Archive request failed; the buffer keeps its previous contents
    #[error("archive fetch failed: {0}")]
    Fetch(String),

    #[error("cannot merge series of unequal length: {parameter} has {actual} rows, expected {expected}")]
    LengthMismatch {
        parameter: String,
        expected: usize,
        actual: usize,
    },

    /// A live value arrived before its id mapping
    #[error("live value references unknown parameter id {0}")]
    UnknownParameterId(u32),

    #[error("live subscription failed: {0}")]
    Subscription(String),

    #[error("plot data source has been disposed")]
    Disposed,
}

pub type PlotResult<T> = Result<T, PlotError>;
