use std::{sync::Arc, time::Duration};

use time::{OffsetDateTime, macros::datetime};

use sift_domain::{
	Candidate, CompiledQuery, Filters, Profile, SortMode, StaticTerminology, Terminology, compile,
	extract,
};
use sift_service::{
	Error, ExposureMatch, GateOutcome, Providers, SearchRequest, SearchResponse, SiftService,
};
use sift_testkit::{CandidateBuilder, Failure, ScriptedMetrics, ScriptedRetrieval, sample_config};

const NOW: OffsetDateTime = datetime!(2026-06-01 0:00 UTC);
const LATE_MOLD_ABSTRACT: &str =
	"Diaries were collected across the whole cohort for two years with notes on mold.";

fn service(retrieval: &Arc<ScriptedRetrieval>, metrics: &Arc<ScriptedMetrics>) -> SiftService {
	SiftService::with_providers(
		sample_config(),
		Providers::new(retrieval.clone(), metrics.clone()),
	)
}

fn request(query: &str) -> SearchRequest {
	SearchRequest { query: query.to_string(), ..Default::default() }
}

fn compiled(query: &str) -> CompiledQuery {
	compile(&extract(query, &StaticTerminology::builtin()))
}

fn ids(response: &SearchResponse) -> Vec<String> {
	response.items.iter().map(|item| item.candidate.id.clone()).collect()
}

fn diabetes_batch(count: usize) -> Vec<Candidate> {
	(0..count)
		.map(|idx| {
			CandidateBuilder::new(format!("d{idx}"))
				.title(&format!("Diabetes cohort {idx}"))
				.abstract_text("Outcomes were tracked for glucose control.")
				.year(2010 + (idx % 15) as i32)
				.citations((idx * 7 % 40) as u32)
				.build()
		})
		.collect()
}

async fn run(svc: &SiftService, req: SearchRequest) -> SearchResponse {
	svc.search_at(req, NOW).await.expect("Search failed.")
}

#[tokio::test]
async fn disease_in_title_scores_high_and_passes_core_gate() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(
		vec![
			CandidateBuilder::new("1").title("Diabetes and kidney outcomes").year(2022).build(),
			CandidateBuilder::new("2").title("Type 2 diabetes in adolescents").year(2019).build(),
			CandidateBuilder::new("3").title("Gestational Diabetes screening").year(2024).build(),
			CandidateBuilder::new("4")
				.title("Insulin pumps")
				.abstract_text("In patients with diabetes, pumps were compared.")
				.year(2024)
				.build(),
		],
		4,
	));
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request("Diabetes")).await;

	assert_eq!(response.trace.gate, GateOutcome::Applied);
	assert_eq!(response.items.len(), 3);
	assert!(!ids(&response).contains(&"4".to_string()));

	for item in &response.items {
		assert!(item.signals.query_relevance_score >= 0.85);
	}

	assert!(!response.trace.tier2_issued);
	assert_eq!(retrieval.queries(), vec![compiled("Diabetes").tier1]);
}

#[tokio::test]
async fn empty_strict_gate_relaxes_to_any_exposure_mention() {
	let batch: Vec<Candidate> = (0..40)
		.map(|idx| {
			CandidateBuilder::new(format!("m{idx}"))
				.title(&format!("Migraine cohort {idx}"))
				.abstract_text(LATE_MOLD_ABSTRACT)
				.year(2020)
				.build()
		})
		.collect();
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(batch, 40));
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request("migraine and mold toxicity")).await;

	assert_eq!(response.trace.gate, GateOutcome::Relaxed);
	assert_eq!(response.items.len(), 10);
	assert!(response.has_more);
	assert_eq!(response.total_count, 40);
	assert!(response.weak_matches.is_empty());
	assert!(
		response
			.items
			.iter()
			.all(|item| item.signals.exposure_match == Some(ExposureMatch::Weak))
	);
}

#[tokio::test]
async fn citations_break_otherwise_equal_candidates() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(
		vec![
			CandidateBuilder::new("101").title("Psoriasis outcomes").year(2024).build(),
			CandidateBuilder::new("202").title("Psoriasis outcomes").year(2024).build(),
		],
		2,
	));
	let metrics = Arc::new(
		ScriptedMetrics::new().with_metrics("101", 10, None).with_metrics("202", 1_000, None),
	);
	let response = run(&service(&retrieval, &metrics), request("Psoriasis")).await;

	assert_eq!(ids(&response), vec!["202".to_string(), "101".to_string()]);
	assert_eq!(response.items[0].candidate.citation_count, 1_000);
	assert!(response.items[0].signals.influence_score > response.items[1].signals.influence_score);
	assert_eq!(
		response.items[0].signals.query_relevance_score,
		response.items[1].signals.query_relevance_score
	);
	assert_eq!(metrics.call_count(), 1);
}

#[tokio::test]
async fn short_tier1_issues_tier2_and_appends_new_ids() {
	let query = "migraine and mold toxicity";
	let tiers = compiled(query);
	let tier2_query = tiers.tier2.clone().expect("Expected a fallback query.");
	let strong = |id: &str| {
		CandidateBuilder::new(id).title("Migraine after indoor mold exposure").year(2023).build()
	};
	let retrieval = Arc::new(
		ScriptedRetrieval::new()
			.with_page(&tiers.tier1, ["a", "b", "c", "d", "e"].map(strong).to_vec(), 5)
			.with_page(&tier2_query, ["d", "e", "f", "g", "h", "i"].map(strong).to_vec(), 300),
	);
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request(query)).await;

	assert_eq!(retrieval.queries(), vec![tiers.tier1.clone(), tier2_query]);
	assert!(response.trace.tier2_issued);
	assert_eq!(response.trace.tier1_count, 5);
	assert_eq!(response.trace.tier2_count, 4);
	assert_eq!(response.trace.scored_count, 9);
	assert_eq!(response.total_count, 9);

	let ranks: Vec<(String, u32)> = response
		.items
		.iter()
		.map(|item| (item.candidate.id.clone(), item.retrieval_rank))
		.collect();

	// Equal scores keep the merged retrieval order: tier-1 first, duplicates dropped.
	assert_eq!(ranks[0], ("a".to_string(), 1));
	assert_eq!(ranks[5], ("f".to_string(), 6));
}

#[tokio::test]
async fn full_tier1_skips_tier2() {
	let query = "migraine and mold toxicity";
	let tiers = compiled(query);
	let batch: Vec<Candidate> = (0..20)
		.map(|idx| {
			CandidateBuilder::new(format!("s{idx}")).title("Migraine and mold").year(2021).build()
		})
		.collect();
	let retrieval = Arc::new(ScriptedRetrieval::new().with_page(&tiers.tier1, batch, 20));
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request(query)).await;

	assert!(!response.trace.tier2_issued);
	assert_eq!(retrieval.calls().len(), 1);
}

#[tokio::test]
async fn identical_inputs_rank_identically() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(diabetes_batch(30), 30));
	let metrics = Arc::new(ScriptedMetrics::new().with_metrics("d3", 120, Some(2.5)));
	let svc = service(&retrieval, &metrics);
	let mut req = request("diabetes");

	req.page_size = Some(100);

	let first = run(&svc, req.clone()).await;
	let second = run(&svc, req).await;

	assert_eq!(first.items, second.items);
	assert_eq!(first.trace.policy_hash, second.trace.policy_hash);
	assert_ne!(first.trace.trace_id, second.trace.trace_id);
}

#[tokio::test]
async fn every_signal_stays_in_unit_range() {
	let mut batch = diabetes_batch(12);

	batch.push(
		CandidateBuilder::new("x")
			.title("Diabetes diabetes diabetes")
			.abstract_text("Diabetes. See NCT01234567.")
			.keywords(&["diabetes"])
			.major_topics(&["Diabetes Mellitus"])
			.year(2030)
			.citations(100_000)
			.impact(40.0)
			.build(),
	);

	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(batch, 13));
	let metrics = Arc::new(ScriptedMetrics::new());
	let mut req = request("latest diabetes");

	req.page_size = Some(100);
	req.profile = Some(Profile {
		conditions: vec!["diabetes".to_string()],
		keywords: vec!["glucose".to_string()],
		location: None,
	});

	let response = run(&service(&retrieval, &metrics), req).await;

	assert_eq!(response.items.len(), 13);

	for item in &response.items {
		let signals = &item.signals;

		for value in [
			signals.query_relevance_score,
			signals.field_weighted_score,
			signals.recency_weight,
			signals.citation_score,
			signals.influence_score,
			signals.recency_score,
			signals.final_score,
		] {
			assert!((0.0..=1.0).contains(&value), "{value} out of range for {}", item.candidate.id);
		}

		let pct = item.match_percentage.expect("Expected a profile match.");

		assert!((0.0..=100.0).contains(&pct));
	}
}

#[tokio::test]
async fn pages_partition_the_ranked_batch() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(diabetes_batch(25), 480));
	let metrics = Arc::new(ScriptedMetrics::new());
	let svc = service(&retrieval, &metrics);
	let mut full_req = request("diabetes");

	full_req.page_size = Some(100);

	let full = run(&svc, full_req).await;
	let mut concatenated = Vec::new();

	for (page, expect_more) in [(1, true), (2, true), (3, false)] {
		let mut req = request("diabetes");

		req.page = Some(page);
		req.page_size = Some(10);

		let response = run(&svc, req).await;

		assert_eq!(response.has_more, expect_more, "page {page}");
		assert_eq!(response.total_count, 25);
		assert!(response.total_is_estimate);

		concatenated.extend(ids(&response));
	}

	assert_eq!(concatenated, ids(&full));

	let mut past_end = request("diabetes");

	past_end.page = Some(9);

	let response = run(&svc, past_end).await;

	assert!(response.items.is_empty());
	assert!(!response.has_more);
}

#[tokio::test]
async fn timed_out_retrieval_yields_empty_page() {
	let retrieval = Arc::new(
		ScriptedRetrieval::new()
			.with_default_page(diabetes_batch(3), 3)
			.with_delay(Duration::from_millis(1_000)),
	);
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request("diabetes")).await;

	assert!(response.items.is_empty());
	assert_eq!(response.total_count, 0);
	assert_eq!(response.trace.degraded.len(), 1);
	assert_eq!(response.trace.degraded[0].stage, "tier1");
	assert_eq!(response.trace.degraded[0].reason, "timeout");
	assert_eq!(metrics.call_count(), 0);
}

#[tokio::test]
async fn timed_out_tier2_keeps_tier1_results() {
	let query = "migraine and mold toxicity";
	let tiers = compiled(query);
	let tier2_query = tiers.tier2.clone().expect("Expected a fallback query.");
	let strong = |id: &str| {
		CandidateBuilder::new(id).title("Migraine after indoor mold exposure").year(2023).build()
	};
	let retrieval = Arc::new(
		ScriptedRetrieval::new()
			.with_page(&tiers.tier1, ["a", "b", "c"].map(strong).to_vec(), 3)
			.with_page(&tier2_query, ["x", "y"].map(strong).to_vec(), 2)
			.with_delay_for(&tier2_query, Duration::from_millis(1_000)),
	);
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request(query)).await;

	assert!(response.trace.tier2_issued);
	assert_eq!(response.trace.tier1_count, 3);
	assert_eq!(response.trace.tier2_count, 0);
	assert_eq!(ids(&response), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
	assert_eq!(response.trace.degraded.len(), 1);
	assert_eq!(response.trace.degraded[0].stage, "tier2");
	assert_eq!(response.trace.degraded[0].reason, "timeout");
}

#[tokio::test]
async fn timed_out_metrics_keep_retrieved_values() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(
		vec![CandidateBuilder::new("1").title("Diabetes outcomes").year(2024).citations(42).build()],
		1,
	));
	let metrics = Arc::new(
		ScriptedMetrics::new()
			.with_metrics("1", 999, None)
			.with_delay(Duration::from_millis(1_000)),
	);
	let response = run(&service(&retrieval, &metrics), request("Diabetes")).await;

	assert_eq!(ids(&response), vec!["1".to_string()]);
	assert_eq!(response.items[0].candidate.citation_count, 42);
	assert_eq!(metrics.call_count(), 1);
	assert_eq!(response.trace.degraded.len(), 1);
	assert_eq!(response.trace.degraded[0].stage, "metrics");
	assert_eq!(response.trace.degraded[0].reason, "timeout");
}

#[tokio::test]
async fn unavailable_backends_degrade_without_failing() {
	let query = "migraine and mold toxicity";
	let tiers = compiled(query);
	let tier2_query = tiers.tier2.clone().expect("Expected a fallback query.");
	let retrieval = Arc::new(
		ScriptedRetrieval::new()
			.with_failure(&tiers.tier1, Failure::Unavailable)
			.with_page(
				&tier2_query,
				vec![CandidateBuilder::new("1").title("Migraine and mould").year(2022).build()],
				1,
			),
	);
	let metrics = Arc::new(ScriptedMetrics::new().with_failure(Failure::Unavailable));
	let response = run(&service(&retrieval, &metrics), request(query)).await;
	let stages: Vec<&str> =
		response.trace.degraded.iter().map(|entry| entry.stage.as_str()).collect();

	assert_eq!(stages, vec!["tier1", "metrics"]);
	assert_eq!(ids(&response), vec!["1".to_string()]);
}

#[tokio::test]
async fn fatal_upstream_errors_abort_the_request() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_failure(Failure::Fatal));
	let metrics = Arc::new(ScriptedMetrics::new());
	let err = service(&retrieval, &metrics)
		.search_at(request("diabetes"), NOW)
		.await
		.expect_err("Expected a fatal retrieval error.");

	assert!(matches!(err, Error::Retrieval { .. }));

	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(diabetes_batch(2), 2));
	let metrics = Arc::new(ScriptedMetrics::new().with_failure(Failure::Fatal));
	let err = service(&retrieval, &metrics)
		.search_at(request("diabetes"), NOW)
		.await
		.expect_err("Expected a fatal metrics error.");

	assert!(matches!(err, Error::Metrics { .. }));
}

#[tokio::test]
async fn weak_exposure_matches_form_a_secondary_list() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(
		vec![
			CandidateBuilder::new("s1").title("Migraine and indoor mold").year(2024).build(),
			CandidateBuilder::new("s2").title("Mold exposure in migraine").year(2023).build(),
			CandidateBuilder::new("w1")
				.title("Migraine triggers")
				.abstract_text(LATE_MOLD_ABSTRACT)
				.year(2024)
				.build(),
			CandidateBuilder::new("w2")
				.title("Migraine in primary care")
				.abstract_text(LATE_MOLD_ABSTRACT)
				.year(2015)
				.build(),
			CandidateBuilder::new("n1").title("Migraine genetics").year(2024).build(),
		],
		5,
	));
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request("migraine and mold toxicity")).await;
	let weak: Vec<&str> =
		response.weak_matches.iter().map(|item| item.candidate.id.as_str()).collect();

	assert_eq!(response.trace.gate, GateOutcome::Applied);
	assert_eq!(ids(&response), vec!["s1".to_string(), "s2".to_string()]);
	assert_eq!(weak, vec!["w1", "w2"]);
}

#[tokio::test]
async fn date_sort_and_filters_apply_to_the_batch() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(
		vec![
			CandidateBuilder::new("old")
				.title("Asthma in adults")
				.year(2012)
				.citations(900)
				.build(),
			CandidateBuilder::new("new").title("Asthma biologics").year(2025).build(),
			CandidateBuilder::new("mid").title("Asthma and obesity").year(2019).build(),
			CandidateBuilder::new("undated").title("Asthma registry").build(),
		],
		4,
	));
	let metrics = Arc::new(ScriptedMetrics::new());
	let svc = service(&retrieval, &metrics);
	let mut by_date = request("asthma");

	by_date.sort = SortMode::Date;

	let response = run(&svc, by_date).await;

	assert_eq!(ids(&response), vec!["new", "mid", "old", "undated"]);
	assert_eq!(retrieval.calls()[0].sort, SortMode::Date);

	let mut filtered = request("asthma");

	filtered.filters = Filters { year_from: Some(2015), ..Default::default() };

	let response = run(&svc, filtered).await;
	let mut kept = ids(&response);

	kept.sort();

	assert_eq!(kept, vec!["mid".to_string(), "new".to_string()]);
}

#[tokio::test]
async fn profile_match_lifts_matching_trial() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(
		vec![
			CandidateBuilder::new("NCT00000001")
				.title("Asthma inhaler study")
				.year(2024)
				.trial("Recruiting", "Phase 3", &["Seattle, WA"])
				.build(),
			CandidateBuilder::new("NCT00000002")
				.title("Asthma inhaler study")
				.year(2024)
				.trial("Recruiting", "Phase 3", &["Boston, MA"])
				.build(),
		],
		2,
	));
	let metrics = Arc::new(ScriptedMetrics::new());
	let mut req = request("asthma");

	req.profile = Some(Profile {
		conditions: vec!["asthma".to_string()],
		keywords: Vec::new(),
		location: Some("Boston".to_string()),
	});

	let response = run(&service(&retrieval, &metrics), req).await;

	assert_eq!(response.items[0].candidate.id, "NCT00000002");
	assert_eq!(response.items[0].match_percentage, Some(100.0));
	assert!(response.items[1].match_percentage.expect("Expected a match.") < 100.0);
}

#[tokio::test]
async fn structured_query_is_sent_verbatim_and_ungated() {
	let query = "asthma[majr] AND mold[tiab]";
	let retrieval = Arc::new(ScriptedRetrieval::new().with_page(
		query,
		vec![CandidateBuilder::new("1").title("Unrelated title").build()],
		1,
	));
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request(query)).await;

	assert_eq!(retrieval.queries(), vec![query.to_string()]);
	assert_eq!(response.trace.gate, GateOutcome::Skipped);
	assert_eq!(response.items.len(), 1);
}

#[tokio::test]
async fn blank_query_returns_empty_page_without_upstream_calls() {
	let retrieval = Arc::new(ScriptedRetrieval::new().with_default_page(diabetes_batch(3), 3));
	let metrics = Arc::new(ScriptedMetrics::new());
	let response = run(&service(&retrieval, &metrics), request("   ")).await;

	assert!(response.items.is_empty());
	assert!(!response.has_more);
	assert!(retrieval.calls().is_empty());
	assert_eq!(metrics.call_count(), 0);
}

struct RadonTerminology;
impl Terminology for RadonTerminology {
	fn expand(&self, term: &str) -> Vec<String> {
		if term == "radon" { vec!["radon gas".to_string()] } else { Vec::new() }
	}

	fn map_to_controlled_vocabulary(&self, term: &str) -> String {
		term.to_string()
	}

	fn is_rare(&self, term: &str) -> bool {
		term == "radon"
	}
}

#[tokio::test]
async fn custom_terminology_drives_compilation() {
	let retrieval = Arc::new(ScriptedRetrieval::new());
	let metrics = Arc::new(ScriptedMetrics::new());
	let svc = service(&retrieval, &metrics).with_terminology(Arc::new(RadonTerminology));
	let response = run(&svc, request("lung cancer and radon exposure")).await;

	assert_eq!(
		response.trace.tier1_query,
		"(\"lung cancer\"[tiab] OR \"lung\"[tiab] OR \"cancer\"[tiab]) AND \
		 (\"radon\"[tiab] OR \"radon gas\"[tiab])"
	);
	assert_eq!(
		response.trace.tier2_query.as_deref(),
		Some("(\"lung cancer\"[tiab] OR \"lung\"[tiab] OR \"cancer\"[tiab])")
	);
	assert!(response.trace.tier2_issued);
	assert_eq!(retrieval.calls().len(), 2);
}
