use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
	#[default]
	Publication,
	Trial,
}

/// A single item returned by the retrieval backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	/// Stable identifier (PMID, NCT id, ...). Used for de-duplication across tiers.
	pub id: String,
	#[serde(default)]
	pub kind: CandidateKind,
	pub title: String,
	#[serde(rename = "abstract", default)]
	pub abstract_text: String,
	#[serde(default)]
	pub keywords: Vec<String>,
	/// Controlled-vocabulary subject tags (MeSH major topics for publications).
	#[serde(default)]
	pub major_topics: Vec<String>,
	#[serde(default)]
	pub year: Option<i32>,
	#[serde(default)]
	pub citation_count: u32,
	/// Normalized impact metric, e.g. a relative citation ratio.
	#[serde(default)]
	pub impact: Option<f32>,
	#[serde(default)]
	pub status: Option<String>,
	#[serde(default)]
	pub phase: Option<String>,
	#[serde(default)]
	pub locations: Vec<String>,
}

/// Citation data returned by the metrics backend for one candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CandidateMetrics {
	pub citation_count: u32,
	pub impact: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
	#[default]
	Relevance,
	Date,
}
impl SortMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Relevance => "relevance",
			Self::Date => "date",
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
	#[serde(default)]
	pub year_from: Option<i32>,
	#[serde(default)]
	pub year_to: Option<i32>,
	/// Trial recruitment status, compared case-insensitively.
	#[serde(default)]
	pub status: Option<String>,
	/// Trial phase, compared case-insensitively.
	#[serde(default)]
	pub phase: Option<String>,
}
impl Filters {
	pub fn is_empty(&self) -> bool {
		self.year_from.is_none()
			&& self.year_to.is_none()
			&& self.status.is_none()
			&& self.phase.is_none()
	}

	pub fn accepts(&self, candidate: &Candidate) -> bool {
		if let Some(from) = self.year_from
			&& candidate.year.map(|year| year < from).unwrap_or(true)
		{
			return false;
		}
		if let Some(to) = self.year_to
			&& candidate.year.map(|year| year > to).unwrap_or(true)
		{
			return false;
		}
		if let Some(status) = self.status.as_deref()
			&& !optional_eq(candidate.status.as_deref(), status)
		{
			return false;
		}
		if let Some(phase) = self.phase.as_deref()
			&& !optional_eq(candidate.phase.as_deref(), phase)
		{
			return false;
		}

		true
	}
}

/// Caller-supplied profile, owned by the profile store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
	#[serde(default)]
	pub conditions: Vec<String>,
	#[serde(default)]
	pub keywords: Vec<String>,
	#[serde(default)]
	pub location: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
	pub wants_recent: bool,
	pub wants_treatment: bool,
	pub wants_trial: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
	/// Free text, processed by concept extraction.
	#[default]
	Natural,
	/// Caller already used field-tagged syntax; passed through verbatim.
	Structured,
	/// A bare PMID, NCT id, or DOI.
	Identifier,
}
impl QueryKind {
	pub fn bypasses_extraction(self) -> bool {
		!matches!(self, Self::Natural)
	}
}

/// Lower-cased, normalized concept terms. A concept group matches when any of its terms does.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSet {
	pub core: Vec<String>,
	pub modifier: Vec<String>,
	pub rare: Vec<String>,
	pub intervention: Vec<String>,
	/// Terms that came from controlled-vocabulary mapping rather than the query text.
	pub vocabulary: BTreeSet<String>,
	/// Vocabulary descriptors that are also free-text synonyms; compiled with both field tags.
	#[serde(default)]
	pub dual_tagged: BTreeSet<String>,
}
impl ConceptSet {
	pub fn is_empty(&self) -> bool {
		self.core.is_empty() && self.modifier.is_empty() && self.rare.is_empty()
	}

	pub fn has_secondary(&self) -> bool {
		!self.modifier.is_empty() || !self.rare.is_empty()
	}

	/// Modifier and rare terms, the set checked for exposure strength.
	pub fn secondary_terms(&self) -> Vec<String> {
		let mut out = self.modifier.clone();

		for term in &self.rare {
			if !out.contains(term) {
				out.push(term.clone());
			}
		}

		out
	}

	pub fn group_count(&self) -> usize {
		[&self.core, &self.modifier, &self.rare].iter().filter(|group| !group.is_empty()).count()
	}
}

/// Output of extraction: everything later stages need to know about the query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedQuery {
	pub raw: String,
	pub kind: QueryKind,
	pub intent: Intent,
	pub concepts: ConceptSet,
	/// Significant query terms used for coverage scoring.
	pub terms: Vec<String>,
	/// Normalized full query used for the exact-phrase check.
	pub phrase: Option<String>,
}
impl ExtractedQuery {
	pub fn skips_gating(&self) -> bool {
		self.kind.bypasses_extraction() || self.concepts.is_empty()
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
	pub tier1: String,
	pub tier2: Option<String>,
}

fn optional_eq(value: Option<&str>, expected: &str) -> bool {
	value.map(|value| value.trim().eq_ignore_ascii_case(expected.trim())).unwrap_or(false)
}
