pub mod error;
pub mod metrics;
pub mod retrieval;

pub use error::{Error, Result};

use std::time::Duration as StdDuration;

use reqwest::{
	Client, Response, StatusCode,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(
	api_key: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn client(cfg: &sift_config::ProviderConfig) -> Result<Client> {
	Ok(Client::builder().timeout(StdDuration::from_millis(cfg.timeout_ms)).build()?)
}

pub(crate) fn endpoint(cfg: &sift_config::ProviderConfig) -> String {
	format!("{}{}", cfg.api_base, cfg.path)
}

/// Maps credential rejections to [`Error::Unauthorized`] before the generic status check.
pub(crate) async fn read_json(res: Response) -> Result<Value> {
	let status = res.status();

	if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
		return Err(Error::Unauthorized { status: status.as_u16() });
	}

	Ok(res.error_for_status()?.json().await?)
}
