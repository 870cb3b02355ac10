use thiserror::Error;

/// Errors surfaced by the bridge's boundary operations.
///
/// Every variant is recovered at the operation boundary and turned into a
/// tagged payload; nothing here crosses the gate as a panic. `ParamNotFound`
/// carries the full list of known normalized names so a caller can correct
/// its spelling without another round trip.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("track {0} not found")]
    TrackNotFound(usize),
    #[error("fx {fx} not found on track {track}")]
    FxNotFound { track: usize, fx: usize },
    #[error("parameter index {index} out of range for fx {fx} on track {track}")]
    ParamIndexOutOfRange { track: usize, fx: usize, index: usize },
    #[error("no parameter matching \"{searched}\"")]
    ParamNotFound {
        searched: String,
        available: Vec<String>,
    },
    #[error("Failed to instantiate plugin")]
    Instantiation(String),
    #[error("No track available for scanning")]
    NoScratchTrack,
    #[error("invalid request: {0}")]
    InvalidInput(String),
}
