//! Per-candidate relevance signals. Everything here is a pure function of the candidate, the
//! extracted query and the reference year, so repeated runs over the same batch agree exactly.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use sift_domain::{
	Candidate, ExtractedQuery,
	text::{contains_word, normalize_text, push_unique, word_positions},
};

const TITLE_WEIGHT: f32 = 0.45;
const MAJOR_TOPIC_WEIGHT: f32 = 0.25;
const KEYWORD_WEIGHT: f32 = 0.15;
const ABSTRACT_WEIGHT: f32 = 0.15;
const UNKNOWN_YEAR_RECENCY: f32 = 0.2;
const BONUS_MIN_RELEVANCE: f32 = 0.5;
const RECENCY_BONUS: f32 = 0.05;
const CROSS_LINK_BONUS: f32 = 0.05;
const RARE_TITLE_BONUS: f32 = 0.10;
const SECTION_MARKERS: &[&str] = &["background:", "objectives:", "objective:"];

static TRIAL_ID: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)\bNCT\d{8}\b").ok());

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMatch {
	None,
	Weak,
	Strong,
}

/// Request-scoped signals for one candidate. Every score lies in [0, 1].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBag {
	pub query_relevance_score: f32,
	pub field_weighted_score: f32,
	/// Absent when the query has no modifier or rare concepts.
	pub exposure_match: Option<ExposureMatch>,
	pub recency_weight: f32,
	pub has_cross_link: bool,
	pub exact_phrase: bool,
	pub citation_score: f32,
	pub influence_score: f32,
	pub recency_score: f32,
	pub final_score: f32,
}

/// What scoring needs from the query, resolved once per request.
#[derive(Clone, Debug)]
pub struct ScoringContext {
	terms: Vec<String>,
	/// Core synonyms and vocabulary descriptors that are not query terms themselves.
	equivalents: Vec<String>,
	phrase: Option<String>,
	secondary: Vec<String>,
	rare: Vec<String>,
	current_year: i32,
}
impl ScoringContext {
	pub fn new(query: &ExtractedQuery, current_year: i32) -> Self {
		let mut terms = Vec::new();

		for term in &query.terms {
			push_unique(&mut terms, term);
		}
		for term in &query.concepts.intervention {
			push_unique(&mut terms, term);
		}

		let equivalents =
			query.concepts.core.iter().filter(|term| !terms.contains(term)).cloned().collect();

		Self {
			terms,
			equivalents,
			phrase: query.phrase.clone().filter(|phrase| !phrase.is_empty()),
			secondary: query.concepts.secondary_terms(),
			rare: query.concepts.rare.clone(),
			current_year,
		}
	}
}

/// Normalized views of a candidate's fields, matched word-for-word against normalized terms.
#[derive(Clone, Debug)]
pub struct CandidateText {
	title: String,
	abstract_text: String,
	keywords: Vec<String>,
	major_topics: Vec<String>,
	combined: String,
	sections: Vec<String>,
}
impl CandidateText {
	pub fn new(candidate: &Candidate) -> Self {
		let title = normalize_text(&candidate.title);
		let abstract_text = normalize_text(&candidate.abstract_text);
		let keywords: Vec<String> =
			candidate.keywords.iter().map(|keyword| normalize_text(keyword)).collect();
		let major_topics =
			candidate.major_topics.iter().map(|topic| normalize_text(topic)).collect();
		let combined = [title.as_str(), abstract_text.as_str()]
			.into_iter()
			.chain(keywords.iter().map(String::as_str))
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>()
			.join(" ");

		Self {
			sections: marked_sentences(&candidate.abstract_text),
			title,
			abstract_text,
			keywords,
			major_topics,
			combined,
		}
	}

	pub fn in_title(&self, term: &str) -> bool {
		contains_word(&self.title, term)
	}

	pub fn in_keywords(&self, term: &str) -> bool {
		self.keywords.iter().any(|keyword| contains_word(keyword, term))
	}

	pub fn in_major_topics(&self, term: &str) -> bool {
		self.major_topics.iter().any(|topic| contains_word(topic, term))
	}

	pub fn in_abstract(&self, term: &str) -> bool {
		contains_word(&self.abstract_text, term)
	}

	/// Title, major-topic tags or keywords.
	pub fn in_high_trust_field(&self, term: &str) -> bool {
		self.in_title(term) || self.in_major_topics(term) || self.in_keywords(term)
	}

	pub fn anywhere(&self, term: &str) -> bool {
		contains_word(&self.combined, term) || self.in_major_topics(term)
	}

	pub fn is_strong_match(&self, term: &str) -> bool {
		if self.in_high_trust_field(term) {
			return true;
		}

		let positions = word_positions(&self.abstract_text, term);

		match positions.as_slice() {
			[] => false,
			[_, _, ..] => true,
			[first] =>
				*first * 4 < self.abstract_text.len()
					|| self.sections.iter().any(|section| contains_word(section, term)),
		}
	}

	fn field_score(&self, term: &str) -> f32 {
		let mut score = 0.0;

		if self.in_title(term) {
			score += TITLE_WEIGHT;
		}
		if self.in_major_topics(term) {
			score += MAJOR_TOPIC_WEIGHT;
		}
		if self.in_keywords(term) {
			score += KEYWORD_WEIGHT;
		}
		if self.in_abstract(term) {
			score += ABSTRACT_WEIGHT;
		}

		score
	}
}

pub fn score_candidate(candidate: &Candidate, ctx: &ScoringContext) -> SignalBag {
	let text = CandidateText::new(candidate);
	// Plain substring on normalized text: "asthma" counts inside "asthmatic".
	let exact_phrase =
		ctx.phrase.as_deref().map(|phrase| text.combined.contains(phrase)).unwrap_or(false);
	let field_weighted_score = field_weighted_score(&text, &ctx.terms, &ctx.equivalents);
	let recency_weight = recency_weight(candidate.year, ctx.current_year);
	let has_cross_link = has_cross_link(candidate);
	let exposure_match =
		(!ctx.secondary.is_empty()).then(|| classify_exposure(&text, &ctx.secondary));
	let query_relevance_score = if exact_phrase {
		1.0
	} else {
		let mut relevance = coverage_score(&text, &ctx.terms).max(field_weighted_score);

		match exposure_match {
			Some(ExposureMatch::None) => relevance = 0.0,
			Some(ExposureMatch::Weak) => relevance *= 0.5,
			Some(ExposureMatch::Strong) | None => {},
		}

		if relevance >= BONUS_MIN_RELEVANCE {
			relevance += RECENCY_BONUS * recency_weight;

			if has_cross_link {
				relevance += CROSS_LINK_BONUS;
			}
		}
		if relevance > 0.0
			&& ctx.rare.iter().any(|term| text.in_title(term) || text.in_keywords(term))
		{
			relevance += RARE_TITLE_BONUS;
		}

		relevance
	};

	SignalBag {
		query_relevance_score: clamp01(query_relevance_score),
		field_weighted_score: clamp01(field_weighted_score),
		exposure_match,
		recency_weight,
		has_cross_link,
		exact_phrase,
		..Default::default()
	}
}

pub fn recency_weight(year: Option<i32>, current_year: i32) -> f32 {
	let Some(year) = year else {
		return UNKNOWN_YEAR_RECENCY;
	};

	match (current_year - year).max(0) {
		0..=2 => 1.0,
		3..=5 => 0.7,
		6..=10 => 0.4,
		_ => 0.15,
	}
}

pub(crate) fn clamp01(value: f32) -> f32 {
	if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
}

/// Term coverage tiers. "Significant" hits are those in the title or keywords.
fn coverage_score(text: &CandidateText, terms: &[String]) -> f32 {
	if terms.is_empty() {
		return 0.0;
	}

	let total = terms.len() as f32;
	let matched = terms.iter().filter(|term| text.anywhere(term)).count();
	let significant =
		terms.iter().filter(|term| text.in_title(term) || text.in_keywords(term)).count();

	if matched == 0 {
		return 0.0;
	}
	if matched < terms.len() {
		return 0.45 * matched as f32 / total;
	}

	let ratio = significant as f32 / total;

	if ratio >= 0.6 {
		0.85 + 0.15 * (ratio - 0.6) / 0.4
	} else if ratio >= 0.4 {
		0.75 + 0.10 * (ratio - 0.4) / 0.2
	} else if significant > 0 {
		0.5 + 0.2 * ratio / 0.4
	} else {
		0.3
	}
}

/// Mean over the query terms, raised to the best single hit. Equivalents only count towards the
/// best hit, so a candidate indexed under a synonym or descriptor is not scored as a miss.
fn field_weighted_score(text: &CandidateText, terms: &[String], equivalents: &[String]) -> f32 {
	if terms.is_empty() {
		return 0.0;
	}

	let scores: Vec<f32> = terms.iter().map(|term| text.field_score(term)).collect();
	let mean = scores.iter().sum::<f32>() / scores.len() as f32;
	let best = scores
		.iter()
		.copied()
		.chain(equivalents.iter().map(|term| text.field_score(term)))
		.fold(0.0_f32, f32::max);

	mean.max(best)
}

fn classify_exposure(text: &CandidateText, secondary: &[String]) -> ExposureMatch {
	if secondary.iter().any(|term| text.is_strong_match(term)) {
		ExposureMatch::Strong
	} else if secondary.iter().any(|term| text.anywhere(term)) {
		ExposureMatch::Weak
	} else {
		ExposureMatch::None
	}
}

fn has_cross_link(candidate: &Candidate) -> bool {
	TRIAL_ID
		.as_ref()
		.map(|re| re.is_match(&candidate.title) || re.is_match(&candidate.abstract_text))
		.unwrap_or(false)
}

/// The sentence following each "Background:" or "Objective(s):" marker, normalized.
fn marked_sentences(raw: &str) -> Vec<String> {
	// ASCII lowering keeps byte offsets aligned with `raw`.
	let lowered = raw.to_ascii_lowercase();
	let mut out = Vec::new();

	for marker in SECTION_MARKERS {
		for (start, _) in lowered.match_indices(marker) {
			let body = &raw[start + marker.len()..];
			let end = body.find(['.', '?', '!']).unwrap_or(body.len());
			let sentence = normalize_text(&body[..end]);

			if !sentence.is_empty() {
				out.push(sentence);
			}
		}
	}

	out
}
