//! Turns raw query text into intent flags, concept groups and scoring terms.
//!
//! Natural-language queries are split on a connector ("X and exposure to Y") into a primary
//! topic and a secondary exposure topic. Age-group qualifiers become modifier concepts,
//! recency words only inform intent, and treatment or trial vocabulary becomes intervention
//! concepts. Structured and identifier queries skip extraction entirely.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
	intent::detect_intent,
	model::{ConceptSet, ExtractedQuery, Intent, QueryKind},
	terminology::Terminology,
	text::{is_stop_word, normalize_text, push_unique},
};

/// Ordered longest first so "and exposure to" wins over "and".
const CONNECTORS: &[&str] = &[
	"and exposure to",
	"and exposed to",
	"in relation to",
	"associated with",
	"exposure to",
	"exposed to",
	"caused by",
	"induced by",
	"related to",
	"linked to",
	"due to",
	"and",
];
const RECENCY_WORDS: &[&str] =
	&["current", "emerging", "latest", "new", "newest", "recent", "recently", "today", "updates"];
const AGE_GROUP_WORDS: &[&str] = &[
	"adolescent",
	"adolescents",
	"adult",
	"adults",
	"child",
	"childhood",
	"children",
	"elderly",
	"geriatric",
	"infant",
	"infants",
	"kids",
	"neonatal",
	"newborn",
	"newborns",
	"paediatric",
	"pediatric",
	"teen",
	"teenagers",
	"teens",
];
const INTERVENTION_WORDS: &[&str] = &[
	"cure",
	"drug",
	"drugs",
	"intervention",
	"interventions",
	"management",
	"medication",
	"medications",
	"phase",
	"randomised",
	"randomized",
	"rct",
	"recruiting",
	"therapeutic",
	"therapies",
	"therapy",
	"treat",
	"treating",
	"treatment",
	"treatments",
	"trial",
	"trials",
];
/// Generic exposure nouns that carry no topic on their own ("mold toxicity" is about mold).
const EXPOSURE_GENERIC_WORDS: &[&str] = &[
	"contamination",
	"effect",
	"effects",
	"exposure",
	"exposures",
	"impact",
	"intake",
	"level",
	"levels",
	"poisoning",
	"risk",
	"toxic",
	"toxicity",
	"use",
];

static FIELD_TAG: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"\[[A-Za-z][A-Za-z0-9 :_-]*\]").ok());
static IDENTIFIER: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"(?i)^(\d{6,9}|nct\d{8}|10\.\d{4,9}/\S+)$").ok()
});
static BOOLEAN_OPERATOR: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"\b(AND|OR|NOT)\b").ok());

#[derive(Debug, Default)]
struct Buckets {
	content: Vec<String>,
	modifier: Vec<String>,
	intervention: Vec<String>,
}

pub fn has_field_tags(raw: &str) -> bool {
	FIELD_TAG.as_ref().map(|re| re.is_match(raw)).unwrap_or(false)
}

pub fn is_identifier(raw: &str) -> bool {
	IDENTIFIER.as_ref().map(|re| re.is_match(raw.trim())).unwrap_or(false)
}

pub fn classify(raw: &str) -> QueryKind {
	if has_field_tags(raw) {
		QueryKind::Structured
	} else if is_identifier(raw) {
		QueryKind::Identifier
	} else {
		QueryKind::Natural
	}
}

/// Never fails: empty input yields an empty concept set and default intent.
pub fn extract(raw: &str, terminology: &dyn Terminology) -> ExtractedQuery {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return ExtractedQuery::default();
	}

	let intent = detect_intent(trimmed);
	let kind = classify(trimmed);

	match kind {
		QueryKind::Structured => ExtractedQuery {
			raw: trimmed.to_string(),
			kind,
			intent,
			concepts: ConceptSet::default(),
			terms: structured_terms(trimmed),
			phrase: None,
		},
		QueryKind::Identifier => {
			let phrase = normalize_text(trimmed);

			ExtractedQuery {
				raw: trimmed.to_string(),
				kind,
				intent,
				concepts: ConceptSet::default(),
				terms: vec![phrase.clone()],
				phrase: Some(phrase),
			}
		},
		QueryKind::Natural => extract_natural(trimmed, intent, terminology),
	}
}

fn extract_natural(
	raw: &str,
	intent: Intent,
	terminology: &dyn Terminology,
) -> ExtractedQuery {
	let normalized = normalize_text(raw);
	let (primary, secondary) = split_on_connector(&normalized);
	let mut primary = bucket_tokens(primary);
	let mut secondary = secondary.map(bucket_tokens).unwrap_or_default();

	secondary.content.retain(|token| !EXPOSURE_GENERIC_WORDS.contains(&token.as_str()));

	if primary.content.is_empty() {
		primary.content = std::mem::take(&mut secondary.content);
	}

	let mut concepts = ConceptSet::default();
	let mut terms = Vec::new();

	for token in &primary.content {
		push_unique(&mut terms, token);
	}

	push_phrase_and_tokens(&mut concepts.core, &primary.content);

	let (rare, modifier): (Vec<String>, Vec<String>) =
		secondary.content.iter().cloned().partition(|token| terminology.is_rare(token));

	push_phrase_and_tokens(&mut concepts.modifier, &modifier);

	for token in modifier.iter().chain(rare.iter()) {
		push_unique(&mut terms, token);
	}
	for token in rare {
		push_unique(&mut concepts.rare, &token);
	}
	for token in primary.modifier.iter().chain(secondary.modifier.iter()) {
		push_unique(&mut concepts.modifier, token);
		push_unique(&mut terms, token);
	}

	if intent.wants_treatment || intent.wants_trial {
		for token in primary.intervention.iter().chain(secondary.intervention.iter()) {
			push_unique(&mut concepts.intervention, token);
			push_unique(&mut terms, token);
		}
	}

	expand_group(&mut concepts.core, terminology);
	expand_group(&mut concepts.modifier, terminology);
	expand_group(&mut concepts.rare, terminology);
	map_core_vocabulary(&mut concepts, terminology);

	let phrase = Some(normalized).filter(|value| !value.is_empty());

	ExtractedQuery {
		raw: raw.to_string(),
		kind: QueryKind::Natural,
		intent,
		concepts,
		terms,
		phrase,
	}
}

fn split_on_connector(normalized: &str) -> (&str, Option<&str>) {
	for connector in CONNECTORS {
		let needle = format!(" {connector} ");

		if let Some(index) = normalized.find(&needle) {
			let left = normalized[..index].trim();
			let right = normalized[index + needle.len()..].trim();

			if has_content(left) && has_content(right) {
				return (left, Some(right));
			}
		}
	}

	(normalized, None)
}

fn has_content(part: &str) -> bool {
	!bucket_tokens(part).content.is_empty()
}

fn bucket_tokens(part: &str) -> Buckets {
	let mut buckets = Buckets::default();

	for token in part.split(' ') {
		if token.chars().count() < 2 || is_recency_token(token) {
			continue;
		}
		if AGE_GROUP_WORDS.contains(&token) {
			push_unique(&mut buckets.modifier, token);
		} else if INTERVENTION_WORDS.contains(&token) {
			push_unique(&mut buckets.intervention, token);
		} else if !is_stop_word(token) {
			push_unique(&mut buckets.content, token);
		}
	}

	buckets
}

fn is_recency_token(token: &str) -> bool {
	if RECENCY_WORDS.contains(&token) {
		return true;
	}

	token.len() == 4
		&& (token.starts_with("19") || token.starts_with("20"))
		&& token.chars().all(|ch| ch.is_ascii_digit())
}

fn push_phrase_and_tokens(group: &mut Vec<String>, tokens: &[String]) {
	if tokens.len() > 1 {
		push_unique(group, &tokens.join(" "));
	}

	for token in tokens {
		push_unique(group, token);
	}
}

fn expand_group(group: &mut Vec<String>, terminology: &dyn Terminology) {
	let originals = group.clone();

	for term in &originals {
		for synonym in terminology.expand(term) {
			push_unique(group, &normalize_text(&synonym));
		}
	}
}

fn map_core_vocabulary(concepts: &mut ConceptSet, terminology: &dyn Terminology) {
	let originals = concepts.core.clone();

	for term in &originals {
		let mapped = normalize_text(&terminology.map_to_controlled_vocabulary(term));

		if mapped.is_empty() || mapped == *term {
			continue;
		}

		if originals.contains(&mapped) {
			concepts.dual_tagged.insert(mapped.clone());
		}

		push_unique(&mut concepts.core, &mapped);
		concepts.vocabulary.insert(mapped);
	}
}

fn structured_terms(raw: &str) -> Vec<String> {
	let without_tags = FIELD_TAG
		.as_ref()
		.map(|re| re.replace_all(raw, " ").into_owned())
		.unwrap_or_else(|| raw.to_string());
	let without_operators = BOOLEAN_OPERATOR
		.as_ref()
		.map(|re| re.replace_all(&without_tags, " ").into_owned())
		.unwrap_or(without_tags);
	let mut out = Vec::new();

	for token in normalize_text(&without_operators).split(' ') {
		if token.chars().count() >= 2 && !is_stop_word(token) {
			push_unique(&mut out, token);
		}
	}

	out
}
