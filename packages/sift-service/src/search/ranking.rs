use std::cmp::Ordering;

use super::{RankedResult, scoring::clamp01};
use sift_config::BlendWeights;
use sift_domain::SortMode;

const IMPACT_SCALE: f32 = 3.0;
const CITATION_SHARE: f32 = 0.7;
const IMPACT_SHARE: f32 = 0.3;

/// Batch-relative normalization inputs, computed once over the scored batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchStats {
	pub citation_p95: u32,
	pub max_age: i32,
	pub current_year: i32,
}
impl BatchStats {
	pub fn from_batch(items: &[RankedResult], current_year: i32) -> Self {
		let mut citations: Vec<u32> =
			items.iter().map(|item| item.candidate.citation_count).collect();

		citations.sort_unstable();

		let max_age = items
			.iter()
			.filter_map(|item| item.candidate.year)
			.map(|year| (current_year - year).max(0))
			.max()
			.unwrap_or(0);

		Self { citation_p95: nearest_rank_p95(&citations), max_age, current_year }
	}
}

pub fn citation_score(citations: u32, p95: u32) -> f32 {
	if p95 == 0 {
		return 0.0;
	}

	clamp01(((1.0 + citations as f64).log10() / (1.0 + p95 as f64).log10()) as f32)
}

pub fn influence_score(citation_score: f32, impact: Option<f32>) -> f32 {
	match impact.filter(|value| value.is_finite()) {
		Some(impact) => {
			let impact = clamp01(impact / IMPACT_SCALE);

			clamp01(CITATION_SHARE * citation_score + IMPACT_SHARE * impact)
		},
		None => clamp01(citation_score),
	}
}

/// `1 / (1 + age)` rescaled so age 0 scores 1 and the oldest dated item in the batch scores 0.
pub fn recency_score(year: Option<i32>, stats: &BatchStats) -> f32 {
	let Some(year) = year else {
		return 0.0;
	};

	if stats.max_age <= 0 {
		return 1.0;
	}

	let age = (stats.current_year - year).clamp(0, stats.max_age) as f32;
	let raw = 1.0 / (1.0 + age);
	let floor = 1.0 / (1.0 + stats.max_age as f32);

	clamp01((raw - floor) / (1.0 - floor))
}

/// Fills the batch-relative signals and the blended final score.
pub fn finalize_scores(items: &mut [RankedResult], stats: &BatchStats, weights: &BlendWeights) {
	for item in items {
		let signals = &mut item.signals;

		signals.citation_score = citation_score(item.candidate.citation_count, stats.citation_p95);
		signals.influence_score = influence_score(signals.citation_score, item.candidate.impact);
		signals.recency_score = recency_score(item.candidate.year, stats);

		let profile = item.match_percentage.map(|pct| clamp01(pct / 100.0)).unwrap_or(0.0);

		signals.final_score = clamp01(
			weights.profile * profile
				+ weights.relevance * signals.query_relevance_score
				+ weights.influence * signals.influence_score
				+ weights.recency * signals.recency_score,
		);
	}
}

/// Total order: final score bucketed at `epsilon` (descending), then relevance, influence, the
/// raw final score, and finally the merged retrieval position.
pub fn sort_results(items: &mut [RankedResult], sort: SortMode, epsilon: f32) {
	match sort {
		SortMode::Relevance => items.sort_by(|a, b| cmp_relevance(a, b, epsilon)),
		SortMode::Date => items.sort_by(|a, b| {
			cmp_year_desc(a.candidate.year, b.candidate.year)
				.then_with(|| cmp_relevance(a, b, epsilon))
		}),
	}
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Nearest-rank 95th percentile of an ascending slice.
fn nearest_rank_p95(sorted: &[u32]) -> u32 {
	if sorted.is_empty() {
		return 0;
	}

	let rank = (sorted.len() as f64 * 0.95).ceil() as usize;

	sorted[rank.clamp(1, sorted.len()) - 1]
}

fn score_bucket(score: f32, epsilon: f32) -> i64 {
	if !score.is_finite() {
		return i64::MIN;
	}

	(f64::from(score) / f64::from(epsilon.max(f32::EPSILON))).floor() as i64
}

fn cmp_relevance(a: &RankedResult, b: &RankedResult, epsilon: f32) -> Ordering {
	score_bucket(b.signals.final_score, epsilon)
		.cmp(&score_bucket(a.signals.final_score, epsilon))
		.then_with(|| {
			cmp_f32_desc(a.signals.query_relevance_score, b.signals.query_relevance_score)
		})
		.then_with(|| cmp_f32_desc(a.signals.influence_score, b.signals.influence_score))
		.then_with(|| cmp_f32_desc(a.signals.final_score, b.signals.final_score))
		.then_with(|| a.retrieval_rank.cmp(&b.retrieval_rank))
		.then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

fn cmp_year_desc(a: Option<i32>, b: Option<i32>) -> Ordering {
	match (a, b) {
		(Some(a), Some(b)) => b.cmp(&a),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}
