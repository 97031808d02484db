use std::collections::HashMap;

use serde_json::Value;

use crate::{Error, Result};
use sift_domain::CandidateMetrics;

/// Looks up citation metrics for a batch of identifiers in a single request. Only numeric
/// publication identifiers are sent; other ids (trials, DOIs) are absent from the result.
pub async fn fetch_metrics(
	cfg: &sift_config::ProviderConfig,
	ids: &[String],
) -> Result<HashMap<String, CandidateMetrics>> {
	let pmids: Vec<&str> = ids
		.iter()
		.map(|id| id.trim())
		.filter(|id| !id.is_empty() && id.chars().all(|ch| ch.is_ascii_digit()))
		.collect();

	if pmids.is_empty() {
		return Ok(HashMap::new());
	}

	let client = crate::client(cfg)?;
	let res = client
		.get(crate::endpoint(cfg))
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.query(&[("pmids", pmids.join(","))])
		.send()
		.await?;
	let json = crate::read_json(res).await?;

	parse_metrics_response(json)
}

pub fn parse_metrics_response(json: Value) -> Result<HashMap<String, CandidateMetrics>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Metrics response is missing data array.".to_string() }
	})?;
	let mut out = HashMap::with_capacity(data.len());

	for entry in data {
		let Some(id) = entry.get("pmid").or_else(|| entry.get("id")).and_then(|v| match v {
			Value::String(raw) => Some(raw.trim().to_string()),
			Value::Number(number) => Some(number.to_string()),
			_ => None,
		}) else {
			continue;
		};
		let citation_count = entry
			.get("citation_count")
			.and_then(Value::as_u64)
			.map(|count| count.min(u32::MAX as u64) as u32)
			.unwrap_or(0);
		// iCite reports null for papers too recent to have a ratio.
		let impact = entry
			.get("relative_citation_ratio")
			.or_else(|| entry.get("impact"))
			.and_then(Value::as_f64)
			.map(|value| value as f32)
			.filter(|value| value.is_finite() && *value >= 0.0);

		out.insert(id, CandidateMetrics { citation_count, impact });
	}

	Ok(out)
}
