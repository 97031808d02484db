use serde::{Deserialize, Serialize};

use super::{
	RankedResult,
	scoring::{CandidateText, ExposureMatch},
};
use sift_domain::ExtractedQuery;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
	/// Structured, identifier and concept-free queries are never gated.
	#[default]
	Skipped,
	Applied,
	/// Strict gates removed everything; strong core plus any exposure mention was used instead.
	Relaxed,
	/// Relaxation was empty too; the whole pre-gate batch was kept.
	Fallback,
}
impl GateOutcome {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Skipped => "skipped",
			Self::Applied => "applied",
			Self::Relaxed => "relaxed",
			Self::Fallback => "fallback",
		}
	}
}

#[derive(Debug, Default)]
pub struct GateResult {
	pub kept: Vec<RankedResult>,
	/// Core matches whose exposure concept only appears incidentally.
	pub weak: Vec<RankedResult>,
	pub outcome: GateOutcome,
}

#[derive(Clone, Copy, Debug)]
struct GateChecks {
	core: bool,
	core_strong: bool,
	secondary_strong: bool,
	secondary_any: bool,
}

pub fn apply_gates(
	query: &ExtractedQuery,
	scored: Vec<RankedResult>,
	relevance_threshold: f32,
) -> GateResult {
	if query.skips_gating() {
		return GateResult { kept: scored, weak: Vec::new(), outcome: GateOutcome::Skipped };
	}

	let has_secondary = query.concepts.has_secondary();
	let checks: Vec<GateChecks> = scored
		.iter()
		.map(|item| gate_checks(query, &CandidateText::new(&item.candidate)))
		.collect();
	let mut kept = Vec::new();
	let mut weak = Vec::new();

	for (item, check) in scored.iter().zip(&checks) {
		let relevance = item.signals.query_relevance_score;
		let above_threshold = relevance >= relevance_threshold || relevance >= 1.0;

		if !check.core {
			continue;
		}
		if has_secondary && !check.secondary_strong {
			if item.signals.exposure_match == Some(ExposureMatch::Weak) {
				weak.push(item.clone());
			}

			continue;
		}
		if above_threshold {
			kept.push(item.clone());
		}
	}

	if !kept.is_empty() || scored.is_empty() || !has_secondary {
		return GateResult { kept, weak, outcome: GateOutcome::Applied };
	}

	let relaxed: Vec<RankedResult> = scored
		.iter()
		.zip(&checks)
		.filter(|(_, check)| check.core_strong && check.secondary_any)
		.map(|(item, _)| item.clone())
		.collect();

	if !relaxed.is_empty() {
		tracing::info!(
			pre_gate = scored.len(),
			relaxed = relaxed.len(),
			"Concept gates emptied the batch. Relaxed to strong core with any exposure mention."
		);

		return GateResult { kept: relaxed, weak: Vec::new(), outcome: GateOutcome::Relaxed };
	}

	tracing::info!(
		pre_gate = scored.len(),
		"Relaxed concept gate is still empty. Falling back to the pre-gate batch."
	);

	GateResult { kept: scored, weak: Vec::new(), outcome: GateOutcome::Fallback }
}

fn gate_checks(query: &ExtractedQuery, text: &CandidateText) -> GateChecks {
	let concepts = &query.concepts;
	let secondary = concepts.secondary_terms();

	GateChecks {
		core: concepts.core.iter().any(|term| text.in_high_trust_field(term)),
		core_strong: concepts.core.iter().any(|term| text.is_strong_match(term)),
		secondary_strong: secondary.iter().any(|term| text.is_strong_match(term)),
		secondary_any: secondary.iter().any(|term| text.anywhere(term)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::search::scoring::{ScoringContext, score_candidate};
	use sift_domain::{Candidate, StaticTerminology, extract};

	fn scored(query: &ExtractedQuery, items: &[(&str, &str)]) -> Vec<RankedResult> {
		let ctx = ScoringContext::new(query, 2026);

		items
			.iter()
			.enumerate()
			.map(|(idx, (title, abstract_text))| {
				let candidate = Candidate {
					id: idx.to_string(),
					title: title.to_string(),
					abstract_text: abstract_text.to_string(),
					year: Some(2024),
					..Default::default()
				};
				let signals = score_candidate(&candidate, &ctx);

				RankedResult::new(candidate, signals, idx as u32 + 1)
			})
			.collect()
	}

	#[test]
	fn core_gate_requires_high_trust_field() {
		let query = extract("asthma", &StaticTerminology::builtin());
		let batch = scored(&query, &[
			("Asthma in adults", "Cohort."),
			("Lung function", "Patients with asthma were followed."),
		]);
		let result = apply_gates(&query, batch, 0.35);

		assert_eq!(result.outcome, GateOutcome::Applied);
		assert_eq!(result.kept.len(), 1);
		assert_eq!(result.kept[0].candidate.id, "0");
	}

	#[test]
	fn weak_exposure_is_set_aside() {
		let query = extract("migraine and mold toxicity", &StaticTerminology::builtin());
		let batch = scored(&query, &[
			("Migraine and indoor mold", "Cohort."),
			(
				"Migraine triggers",
				"Diaries were collected across the whole cohort for two years with notes on mold.",
			),
		]);
		let result = apply_gates(&query, batch, 0.35);

		assert_eq!(result.outcome, GateOutcome::Applied);
		assert_eq!(result.kept.len(), 1);
		assert_eq!(result.weak.len(), 1);
		assert_eq!(result.weak[0].candidate.id, "1");
	}

	#[test]
	fn relaxation_then_fallback() {
		let query = extract("migraine and mold toxicity", &StaticTerminology::builtin());
		let weak_only = scored(&query, &[(
			"Migraine triggers",
			"Diaries were collected across the whole cohort for two years with notes on mold.",
		)]);
		let relaxed = apply_gates(&query, weak_only, 0.35);

		assert_eq!(relaxed.outcome, GateOutcome::Relaxed);
		assert_eq!(relaxed.kept.len(), 1);
		assert!(relaxed.weak.is_empty());

		let unrelated = scored(&query, &[("Sleep quality", "Nothing relevant here.")]);
		let fallback = apply_gates(&query, unrelated, 0.35);

		assert_eq!(fallback.outcome, GateOutcome::Fallback);
		assert_eq!(fallback.kept.len(), 1);
	}

	fn indexed_only(query: &ExtractedQuery, id: &str) -> RankedResult {
		let candidate = Candidate {
			id: id.to_string(),
			title: "Cardiac outcomes after discharge".to_string(),
			abstract_text: "Registry follow-up.".to_string(),
			major_topics: vec!["Myocardial Infarction".to_string()],
			year: Some(2024),
			..Default::default()
		};
		let signals = score_candidate(&candidate, &ScoringContext::new(query, 2026));

		RankedResult::new(candidate, signals, 1)
	}

	#[test]
	fn threshold_drops_low_relevance_core_matches() {
		let query = extract("heart attack", &StaticTerminology::builtin());
		let item = indexed_only(&query, "mi");

		assert!(item.signals.query_relevance_score < 0.35);

		let strict = apply_gates(&query, vec![item.clone()], 0.35);

		assert_eq!(strict.outcome, GateOutcome::Applied);
		assert!(strict.kept.is_empty());

		let open = apply_gates(&query, vec![item], 0.0);

		assert_eq!(open.kept.len(), 1);
		assert_eq!(open.kept[0].candidate.id, "mi");
	}

	#[test]
	fn raising_the_threshold_never_adds_results() {
		let query = extract("heart attack", &StaticTerminology::builtin());
		let mut batch = scored(&query, &[
			("Heart attack in women", "Cohort."),
			("Heart attack registry", "Outcomes after heart attack in rural clinics."),
			("Cardiology workforce", "Heart attack was mentioned once."),
		]);

		batch.push(indexed_only(&query, "mi"));

		let mut previous: Option<Vec<String>> = None;

		for threshold in [0.0, 0.2, 0.35, 0.5, 0.9] {
			let result = apply_gates(&query, batch.clone(), threshold);
			let ids: Vec<String> =
				result.kept.iter().map(|item| item.candidate.id.clone()).collect();

			if let Some(previous) = &previous {
				assert!(ids.len() <= previous.len());
				assert!(ids.iter().all(|id| previous.contains(id)));
			} else {
				assert_eq!(ids.len(), 3);
			}

			previous = Some(ids);
		}
	}

	#[test]
	fn structured_queries_skip_gates() {
		let query = extract("asthma[majr]", &StaticTerminology::builtin());
		let batch = scored(&query, &[("Unrelated", "Nothing.")]);
		let result = apply_gates(&query, batch, 0.35);

		assert_eq!(result.outcome, GateOutcome::Skipped);
		assert_eq!(result.kept.len(), 1);
	}
}
