use crate::model::{CompiledQuery, ConceptSet, ExtractedQuery};

pub const TITLE_ABSTRACT_TAG: &str = "[tiab]";
pub const MAJOR_TOPIC_TAG: &str = "[majr]";

/// Builds the tier-1 query and, when at least two concept groups exist, a broader tier-2
/// fallback. Queries that bypass extraction are passed through verbatim.
pub fn compile(query: &ExtractedQuery) -> CompiledQuery {
	if query.kind.bypasses_extraction() || query.concepts.is_empty() {
		return CompiledQuery { tier1: query.raw.trim().to_string(), tier2: None };
	}

	let concepts = &query.concepts;
	let core = group_clause(&concepts.core, concepts);
	let modifier = group_clause(&concepts.modifier, concepts);
	let rare = group_clause(&concepts.rare, concepts);
	let tier1 = join_and([core.as_deref(), modifier.as_deref(), rare.as_deref()]);
	let tier2 = if concepts.group_count() < 2 {
		None
	} else if rare.is_some() && modifier.is_some() {
		Some(join_and([core.as_deref(), modifier.as_deref(), None]))
	} else {
		Some(join_and([core.as_deref(), None, None]))
	};

	CompiledQuery { tier1, tier2: tier2.filter(|value| !value.is_empty()) }
}

fn group_clause(group: &[String], concepts: &ConceptSet) -> Option<String> {
	let parts: Vec<String> = group
		.iter()
		.filter_map(|term| {
			let cleaned = term.replace('"', " ");
			let cleaned = cleaned.trim();

			if cleaned.is_empty() {
				return None;
			}

			if concepts.dual_tagged.contains(term) {
				return Some(format!(
					"\"{cleaned}\"{TITLE_ABSTRACT_TAG} OR \"{cleaned}\"{MAJOR_TOPIC_TAG}"
				));
			}

			let tag = if concepts.vocabulary.contains(term) {
				MAJOR_TOPIC_TAG
			} else {
				TITLE_ABSTRACT_TAG
			};

			Some(format!("\"{cleaned}\"{tag}"))
		})
		.collect();

	if parts.is_empty() {
		return None;
	}

	Some(format!("({})", parts.join(" OR ")))
}

fn join_and(clauses: [Option<&str>; 3]) -> String {
	clauses.into_iter().flatten().collect::<Vec<_>>().join(" AND ")
}
