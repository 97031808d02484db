use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read config file at {path:?}.")]
	ReadConfig { path: PathBuf, source: std::io::Error },
	#[error("Failed to parse config file at {path:?}.")]
	ParseConfig { path: PathBuf, source: toml::de::Error },
	#[error("{key} {reason}")]
	Validation { key: String, reason: String },
}
impl Error {
	pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::Validation { key: key.into(), reason: reason.into() }
	}
}
