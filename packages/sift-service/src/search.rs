pub mod gate;
pub mod policy;
pub mod profile;
pub mod ranking;
pub mod retrieval;
pub mod scoring;

pub use gate::GateOutcome;
pub use retrieval::Degradation;
pub use scoring::{ExposureMatch, SignalBag};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, SiftService};
use gate::apply_gates;
use ranking::{BatchStats, finalize_scores, sort_results};
use retrieval::{RetrievalPlan, enrich_metrics, retrieve};
use scoring::{ScoringContext, score_candidate};
use sift_domain::{Candidate, Filters, Intent, Profile, QueryKind, SortMode, compile, extract};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub filters: Filters,
	#[serde(default)]
	pub profile: Option<Profile>,
	/// 1-based.
	#[serde(default)]
	pub page: Option<u32>,
	#[serde(default)]
	pub page_size: Option<u32>,
	#[serde(default)]
	pub sort: SortMode,
	/// Candidates to fetch per tier; clamped to `search.max_batch_cap`.
	#[serde(default)]
	pub batch_size: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
	pub candidate: Candidate,
	pub signals: SignalBag,
	/// Profile match in [0, 100]; absent without a comparable profile.
	pub match_percentage: Option<f32>,
	/// 1-based position in the merged retrieval batch.
	pub retrieval_rank: u32,
}
impl RankedResult {
	pub fn new(candidate: Candidate, signals: SignalBag, retrieval_rank: u32) -> Self {
		Self { candidate, signals, match_percentage: None, retrieval_rank }
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchTrace {
	pub trace_id: Uuid,
	pub query_kind: QueryKind,
	pub intent: Intent,
	pub tier1_query: String,
	pub tier2_query: Option<String>,
	pub tier2_issued: bool,
	pub tier1_count: u32,
	pub tier2_count: u32,
	/// Candidates left after filters, before gating.
	pub scored_count: u32,
	pub gate: GateOutcome,
	pub degraded: Vec<Degradation>,
	pub policy_hash: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub items: Vec<RankedResult>,
	/// Core matches with only an incidental exposure mention. Filled only when the primary list
	/// is shorter than `search.min_tier1_results`; never merged into `items`.
	pub weak_matches: Vec<RankedResult>,
	pub page: u32,
	pub page_size: u32,
	pub has_more: bool,
	/// `min(upstream total, ranked batch length)`.
	pub total_count: u64,
	/// Always true: counts are bounded by the fetched batch.
	pub total_is_estimate: bool,
	pub trace: SearchTrace,
}

impl SiftService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		self.search_at(req, OffsetDateTime::now_utc()).await
	}

	/// Same as [`SiftService::search`] with an explicit clock, so recency is reproducible.
	pub async fn search_at(
		&self,
		req: SearchRequest,
		now: OffsetDateTime,
	) -> Result<SearchResponse> {
		let trace_id = Uuid::new_v4();
		let search_cfg = &self.cfg.search;
		let page = req.page.unwrap_or(1).max(1);
		let page_size = req
			.page_size
			.unwrap_or(search_cfg.default_page_size)
			.clamp(1, search_cfg.max_page_size);
		let batch_size =
			req.batch_size.unwrap_or(search_cfg.batch_cap).clamp(1, search_cfg.max_batch_cap);
		let extracted = extract(&req.query, self.terminology.as_ref());
		let compiled = compile(&extracted);

		tracing::debug!(
			trace_id = %trace_id,
			kind = ?extracted.kind,
			sort = req.sort.as_str(),
			filtered = !req.filters.is_empty(),
			tier1 = %compiled.tier1,
			tier2 = ?compiled.tier2,
			"Compiled search query."
		);

		let plan = RetrievalPlan {
			compiled: &compiled,
			batch_size,
			sort: req.sort,
			min_tier1_results: search_cfg.min_tier1_results,
			trace_id,
		};
		let mut batch = retrieve(&self.cfg, &self.providers, plan).await?;

		enrich_metrics(
			&self.cfg,
			&self.providers,
			&mut batch.candidates,
			trace_id,
			&mut batch.degraded,
		)
		.await?;

		let ctx = ScoringContext::new(&extracted, now.year());
		let mut scored: Vec<RankedResult> = batch
			.candidates
			.into_iter()
			.enumerate()
			.filter(|(_, candidate)| req.filters.accepts(candidate))
			.map(|(idx, candidate)| {
				let signals = score_candidate(&candidate, &ctx);
				let mut item = RankedResult::new(candidate, signals, idx as u32 + 1);

				item.match_percentage = req
					.profile
					.as_ref()
					.and_then(|profile| profile::match_percentage(profile, &item.candidate));

				item
			})
			.collect();
		let scored_count = scored.len() as u32;
		let stats = BatchStats::from_batch(&scored, now.year());
		let weights = if extracted.intent.wants_recent {
			&self.cfg.ranking.weights.recent
		} else {
			&self.cfg.ranking.weights.standard
		};

		// Batch-relative signals are computed over the whole pre-gate batch so primary and weak
		// lists share one normalization.
		finalize_scores(&mut scored, &stats, weights);

		let gated = apply_gates(&extracted, scored, self.cfg.ranking.relevance_threshold);
		let mut items = gated.kept;
		let mut weak_matches = if items.len() < search_cfg.min_tier1_results as usize {
			gated.weak
		} else {
			Vec::new()
		};
		let epsilon = self.cfg.ranking.tie_epsilon;

		sort_results(&mut items, req.sort, epsilon);
		sort_results(&mut weak_matches, req.sort, epsilon);
		weak_matches.truncate(self.cfg.ranking.weak_match_limit as usize);

		let ranked_len = items.len();
		let start = (page as usize - 1).saturating_mul(page_size as usize).min(ranked_len);
		let end = start.saturating_add(page_size as usize).min(ranked_len);
		let has_more = (page as usize).saturating_mul(page_size as usize) < ranked_len;
		let page_items: Vec<RankedResult> = items.drain(start..end).collect();
		let total_count = batch.total_count.min(ranked_len as u64);
		let policy_hash = policy::hash_policy_snapshot(&policy::build_policy_snapshot(&self.cfg));

		tracing::info!(
			trace_id = %trace_id,
			scored = scored_count,
			ranked = ranked_len,
			weak = weak_matches.len(),
			gate = gated.outcome.as_str(),
			degraded = batch.degraded.len(),
			"Search ranked."
		);

		Ok(SearchResponse {
			items: page_items,
			weak_matches,
			page,
			page_size,
			has_more,
			total_count,
			total_is_estimate: true,
			trace: SearchTrace {
				trace_id,
				query_kind: extracted.kind,
				intent: extracted.intent,
				tier1_query: compiled.tier1.clone(),
				tier2_query: compiled.tier2.clone(),
				tier2_issued: batch.tier2_issued,
				tier1_count: batch.tier1_count,
				tier2_count: batch.tier2_count,
				scored_count,
				gate: gated.outcome,
				degraded: batch.degraded,
				policy_hash,
			},
		})
	}
}
