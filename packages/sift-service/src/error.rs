pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Only non-recoverable upstream faults surface here. Timeouts and unavailable backends are
/// absorbed by the retrieval coordinator and reported in the search trace instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Retrieval error: {message}")]
	Retrieval { message: String },
	#[error("Metrics error: {message}")]
	Metrics { message: String },
}
