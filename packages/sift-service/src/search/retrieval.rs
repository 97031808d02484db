use std::{collections::HashSet, time::Duration as StdDuration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Providers, Result};
use sift_config::Config;
use sift_domain::{Candidate, CompiledQuery, SortMode};
use sift_providers::retrieval::{FetchPage, FetchRequest};

/// An upstream call that was absorbed instead of failing the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
	pub stage: String,
	pub reason: String,
}
impl Degradation {
	fn new(stage: &str, reason: impl Into<String>) -> Self {
		Self { stage: stage.to_string(), reason: reason.into() }
	}
}

#[derive(Clone, Copy, Debug)]
pub struct RetrievalPlan<'a> {
	pub compiled: &'a CompiledQuery,
	pub batch_size: u32,
	pub sort: SortMode,
	pub min_tier1_results: u32,
	pub trace_id: Uuid,
}

#[derive(Debug, Default)]
pub struct RetrievedBatch {
	pub candidates: Vec<Candidate>,
	/// Sum of the totals reported by every issued tier; an estimate, not a corpus count.
	pub total_count: u64,
	pub tier1_count: u32,
	pub tier2_count: u32,
	pub tier2_issued: bool,
	pub degraded: Vec<Degradation>,
}

enum Tier {
	One,
	Two,
}
impl Tier {
	fn as_str(&self) -> &'static str {
		match self {
			Self::One => "tier1",
			Self::Two => "tier2",
		}
	}
}

/// Issues tier-1 and, when it comes back short and a fallback exists, tier-2. Tier-1 items win
/// identifier collisions and the merged batch never exceeds `batch_size`.
pub async fn retrieve(
	cfg: &Config,
	providers: &Providers,
	plan: RetrievalPlan<'_>,
) -> Result<RetrievedBatch> {
	let mut out = RetrievedBatch::default();

	if plan.compiled.tier1.trim().is_empty() {
		return Ok(out);
	}

	let batch_size = plan.batch_size as usize;
	let mut seen = HashSet::new();
	let tier1 =
		fetch_tier(cfg, providers, &plan, Tier::One, &plan.compiled.tier1, &mut out).await?;

	out.total_count = tier1.total_count;

	for candidate in tier1.items {
		if out.candidates.len() < batch_size && seen.insert(candidate.id.clone()) {
			out.candidates.push(candidate);
		}
	}

	out.tier1_count = out.candidates.len() as u32;

	if let Some(tier2_query) = plan.compiled.tier2.as_deref()
		&& out.tier1_count < plan.min_tier1_results
	{
		tracing::info!(
			trace_id = %plan.trace_id,
			tier1_count = out.tier1_count,
			min_tier1_results = plan.min_tier1_results,
			"Tier-1 came back short. Issuing tier-2."
		);

		out.tier2_issued = true;

		let tier2 = fetch_tier(cfg, providers, &plan, Tier::Two, tier2_query, &mut out).await?;

		out.total_count = out.total_count.saturating_add(tier2.total_count);

		for candidate in tier2.items {
			if out.candidates.len() < batch_size && seen.insert(candidate.id.clone()) {
				out.candidates.push(candidate);
				out.tier2_count += 1;
			}
		}
	}

	tracing::debug!(
		trace_id = %plan.trace_id,
		tier1_count = out.tier1_count,
		tier2_count = out.tier2_count,
		total_count = out.total_count,
		"Retrieval finished."
	);

	Ok(out)
}

/// One batched metrics lookup for the whole batch. Values from the metrics backend replace
/// whatever the retrieval backend reported; ids it does not know keep their retrieved values.
pub async fn enrich_metrics(
	cfg: &Config,
	providers: &Providers,
	candidates: &mut [Candidate],
	trace_id: Uuid,
	degraded: &mut Vec<Degradation>,
) -> Result<()> {
	if candidates.is_empty() {
		return Ok(());
	}

	let provider = &cfg.providers.metrics;
	let ids: Vec<String> = candidates.iter().map(|candidate| candidate.id.clone()).collect();
	let timeout = StdDuration::from_millis(provider.timeout_ms);
	let call = providers.metrics.fetch_metrics(provider, &ids);
	let metrics = match tokio::time::timeout(timeout, call).await {
		Ok(Ok(metrics)) => metrics,
		Ok(Err(err)) if err.is_fatal() => {
			return Err(Error::Metrics { message: err.to_string() });
		},
		Ok(Err(err)) => {
			tracing::warn!(
				trace_id = %trace_id,
				error = %err,
				"Metrics lookup failed. Using retrieved values."
			);
			degraded.push(Degradation::new("metrics", err.to_string()));

			return Ok(());
		},
		Err(_) => {
			tracing::warn!(
				trace_id = %trace_id,
				timeout_ms = provider.timeout_ms,
				"Metrics lookup timed out. Using retrieved values."
			);
			degraded.push(Degradation::new("metrics", "timeout"));

			return Ok(());
		},
	};

	for candidate in candidates {
		if let Some(entry) = metrics.get(&candidate.id) {
			candidate.citation_count = entry.citation_count;
			candidate.impact = entry.impact.or(candidate.impact);
		}
	}

	Ok(())
}

async fn fetch_tier(
	cfg: &Config,
	providers: &Providers,
	plan: &RetrievalPlan<'_>,
	tier: Tier,
	query: &str,
	out: &mut RetrievedBatch,
) -> Result<FetchPage> {
	let provider = &cfg.providers.retrieval;
	let req = FetchRequest {
		query: query.to_string(),
		page: 1,
		page_size: plan.batch_size,
		sort: plan.sort,
	};
	let call = providers.retrieval.fetch_candidates(provider, &req);

	match tokio::time::timeout(StdDuration::from_millis(provider.timeout_ms), call).await {
		Ok(Ok(page)) => Ok(page),
		Ok(Err(err)) if err.is_fatal() => Err(Error::Retrieval { message: err.to_string() }),
		Ok(Err(err)) => {
			tracing::warn!(
				trace_id = %plan.trace_id,
				tier = tier.as_str(),
				error = %err,
				"Retrieval backend unavailable. Treating tier as empty."
			);
			out.degraded.push(Degradation::new(tier.as_str(), err.to_string()));

			Ok(FetchPage::default())
		},
		Err(_) => {
			tracing::warn!(
				trace_id = %plan.trace_id,
				tier = tier.as_str(),
				timeout_ms = provider.timeout_ms,
				"Retrieval backend timed out. Treating tier as empty."
			);
			out.degraded.push(Degradation::new(tier.as_str(), "timeout"));

			Ok(FetchPage::default())
		},
	}
}
