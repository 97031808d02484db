use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};
use sift_domain::{Candidate, CandidateKind, SortMode};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
	pub query: String,
	pub page: u32,
	pub page_size: u32,
	pub sort: SortMode,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchPage {
	pub items: Vec<Candidate>,
	/// Total reported by the backend for the whole query, not just this page.
	pub total_count: u64,
}

pub async fn fetch_candidates(
	cfg: &sift_config::ProviderConfig,
	req: &FetchRequest,
) -> Result<FetchPage> {
	let client = crate::client(cfg)?;
	let res = client
		.post(crate::endpoint(cfg))
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(req)
		.send()
		.await?;
	let json = crate::read_json(res).await?;

	parse_fetch_response(json)
}

pub fn parse_fetch_response(json: Value) -> Result<FetchPage> {
	let items = json
		.get("items")
		.or_else(|| json.get("results"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Retrieval response is missing items array.".to_string(),
		})?;
	let mut out = Vec::with_capacity(items.len());

	for item in items {
		// Items without an identifier cannot be de-duplicated and are skipped.
		if let Some(candidate) = parse_candidate(item) {
			out.push(candidate);
		}
	}

	let total_count = json
		.get("total_count")
		.or_else(|| json.get("totalCount"))
		.and_then(as_u64_lenient)
		.unwrap_or(out.len() as u64);

	Ok(FetchPage { items: out, total_count })
}

fn parse_candidate(item: &Value) -> Option<Candidate> {
	let id = ["id", "pmid", "nct_id", "uid"]
		.iter()
		.find_map(|key| item.get(*key).and_then(as_id))?;
	let kind = match first_str(item, &["kind", "type"]).map(str::to_ascii_lowercase).as_deref() {
		Some("trial") | Some("clinical_trial") => CandidateKind::Trial,
		Some(_) => CandidateKind::Publication,
		None if id.to_ascii_uppercase().starts_with("NCT") => CandidateKind::Trial,
		None => CandidateKind::Publication,
	};

	Some(Candidate {
		kind,
		title: first_str(item, &["title", "brief_title"]).unwrap_or_default().to_string(),
		abstract_text: first_str(item, &["abstract", "summary", "brief_summary"])
			.unwrap_or_default()
			.to_string(),
		keywords: str_list(item, &["keywords", "conditions"]),
		major_topics: str_list(item, &["major_topics", "mesh_major", "mesh_terms"]),
		year: ["year", "pub_year", "pub_date", "start_date"]
			.iter()
			.find_map(|key| item.get(*key).and_then(as_year)),
		citation_count: item
			.get("citation_count")
			.and_then(as_u64_lenient)
			.map(|count| count.min(u32::MAX as u64) as u32)
			.unwrap_or(0),
		impact: ["impact", "relative_citation_ratio"]
			.iter()
			.find_map(|key| item.get(*key).and_then(Value::as_f64))
			.map(|value| value as f32)
			.filter(|value| value.is_finite()),
		status: first_str(item, &["status", "overall_status"]).map(str::to_string),
		phase: first_str(item, &["phase"]).map(str::to_string),
		locations: str_list(item, &["locations"]),
		id,
	})
}

fn as_id(value: &Value) -> Option<String> {
	match value {
		Value::String(raw) => Some(raw.trim().to_string()).filter(|id| !id.is_empty()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

fn as_u64_lenient(value: &Value) -> Option<u64> {
	value.as_u64().or_else(|| value.as_str().and_then(|raw| raw.trim().parse().ok()))
}

/// Accepts `2021`, `"2021"` and date strings such as `"2021-03-04"` or `"2021 Mar"`.
fn as_year(value: &Value) -> Option<i32> {
	if let Some(year) = value.as_i64() {
		return i32::try_from(year).ok();
	}

	let raw = value.as_str()?.trim();
	let digits: String = raw.chars().take(4).collect();

	if digits.len() == 4 && digits.chars().all(|ch| ch.is_ascii_digit()) {
		digits.parse().ok()
	} else {
		None
	}
}

fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
	keys.iter().find_map(|key| item.get(*key).and_then(Value::as_str))
}

fn str_list(item: &Value, keys: &[&str]) -> Vec<String> {
	let Some(values) = keys.iter().find_map(|key| item.get(*key).and_then(Value::as_array)) else {
		return Vec::new();
	};

	values
		.iter()
		.filter_map(Value::as_str)
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
		.collect()
}
