use std::collections::{BTreeMap, BTreeSet};

use crate::text::{normalize_text, push_unique};

const BUILTIN_SYNONYMS: &[(&str, &[&str])] = &[
	("alzheimers", &["alzheimer disease"]),
	("cancer", &["neoplasm", "carcinoma"]),
	("covid", &["covid 19", "sars cov 2"]),
	("diabetes", &["diabetes mellitus"]),
	("elderly", &["older adults", "aged", "geriatric"]),
	("heart attack", &["myocardial infarction"]),
	("high blood pressure", &["hypertension"]),
	("kidney disease", &["renal disease", "nephropathy"]),
	("long covid", &["post acute covid 19 syndrome"]),
	("mold", &["mould"]),
	("pediatric", &["paediatric", "children", "child", "infant", "adolescent"]),
	("stroke", &["cerebrovascular accident"]),
];
const BUILTIN_VOCABULARY: &[(&str, &str)] = &[
	("alzheimers", "alzheimer disease"),
	("cancer", "neoplasms"),
	("depression", "depressive disorder"),
	("diabetes", "diabetes mellitus"),
	("heart attack", "myocardial infarction"),
	("high blood pressure", "hypertension"),
	("migraine", "migraine disorders"),
	("mold", "fungi"),
	("stroke", "stroke"),
];
const BUILTIN_RARE: &[&str] =
	&["aflatoxin", "glyphosate", "microplastics", "mycotoxin", "mycotoxins", "pfas"];

/// Synonym expansion and controlled-vocabulary mapping. Implementations are pure: an unknown
/// term expands to nothing and maps to itself.
pub trait Terminology
where
	Self: Send + Sync,
{
	fn expand(&self, term: &str) -> Vec<String>;

	fn map_to_controlled_vocabulary(&self, term: &str) -> String;

	fn is_rare(&self, _term: &str) -> bool {
		false
	}
}

/// Table-backed terminology: a built-in biomedical table merged with configured entries.
#[derive(Clone, Debug, Default)]
pub struct StaticTerminology {
	synonyms: BTreeMap<String, Vec<String>>,
	vocabulary: BTreeMap<String, String>,
	rare: BTreeSet<String>,
}
impl StaticTerminology {
	pub fn builtin() -> Self {
		let mut out = Self::default();

		for (term, synonyms) in BUILTIN_SYNONYMS {
			out.add_synonyms(term, synonyms.iter().copied());
		}
		for (term, descriptor) in BUILTIN_VOCABULARY {
			out.add_vocabulary(term, descriptor);
		}
		for term in BUILTIN_RARE {
			out.add_rare(term);
		}

		out
	}

	pub fn from_config(cfg: &sift_config::Terminology) -> Self {
		let mut out = Self::builtin();

		for (term, synonyms) in &cfg.synonyms {
			out.add_synonyms(term, synonyms.iter().map(String::as_str));
		}
		for (term, descriptor) in &cfg.controlled_vocabulary {
			out.add_vocabulary(term, descriptor);
		}
		for term in &cfg.rare_terms {
			out.add_rare(term);
		}

		out
	}

	fn add_synonyms<'a>(&mut self, term: &str, synonyms: impl Iterator<Item = &'a str>) {
		let key = normalize_text(term);

		if key.is_empty() {
			return;
		}

		let entry = self.synonyms.entry(key.clone()).or_default();

		for synonym in synonyms {
			let synonym = normalize_text(synonym);

			if synonym != key {
				push_unique(entry, &synonym);
			}
		}
	}

	fn add_vocabulary(&mut self, term: &str, descriptor: &str) {
		let key = normalize_text(term);
		let descriptor = normalize_text(descriptor);

		if !key.is_empty() && !descriptor.is_empty() {
			self.vocabulary.insert(key, descriptor);
		}
	}

	fn add_rare(&mut self, term: &str) {
		let key = normalize_text(term);

		if !key.is_empty() {
			self.rare.insert(key);
		}
	}
}
impl Terminology for StaticTerminology {
	fn expand(&self, term: &str) -> Vec<String> {
		self.synonyms.get(&normalize_text(term)).cloned().unwrap_or_default()
	}

	fn map_to_controlled_vocabulary(&self, term: &str) -> String {
		let key = normalize_text(term);

		self.vocabulary.get(&key).cloned().unwrap_or(key)
	}

	fn is_rare(&self, term: &str) -> bool {
		self.rare.contains(&normalize_text(term))
	}
}
