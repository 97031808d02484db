pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Upstream rejected credentials with status {status}.")]
	Unauthorized { status: u16 },
}
impl Error {
	/// Fatal errors are configuration or credential faults that retrying cannot fix. Everything
	/// else (timeouts, refused connections, 5xx, malformed payloads) leaves the upstream merely
	/// unavailable for this call.
	pub fn is_fatal(&self) -> bool {
		match self {
			Self::Reqwest(err) => err.is_builder(),
			Self::InvalidHeaderName(_)
			| Self::InvalidHeaderValue(_)
			| Self::InvalidConfig { .. }
			| Self::Unauthorized { .. } => true,
			Self::SerdeJson(_) | Self::InvalidResponse { .. } => false,
		}
	}
}
