use std::sync::LazyLock;

use regex::Regex;

use crate::model::Intent;

static RECENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"(?i)\b(latest|recent|recently|newest|new|current|emerging|up[- ]to[- ]date|this year|last (few|\d+) years?|(19|20)\d{2})\b",
	)
	.ok()
});
static TREATMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"(?i)\b(treat|treats|treating|treatment|treatments|therapy|therapies|therapeutic|drug|drugs|medication|medications|management|intervention|interventions|cure)\b",
	)
	.ok()
});
static TRIAL: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"(?i)\b(trial|trials|rct|rcts|randomi[sz]ed|recruiting|enrolling|phase\s*(i{1,3}|iv|[1-4]))\b",
	)
	.ok()
});

/// Each flag is checked independently against the raw, unstripped query.
pub fn detect_intent(raw: &str) -> Intent {
	Intent {
		wants_recent: is_match(&RECENT, raw),
		wants_treatment: is_match(&TREATMENT, raw),
		wants_trial: is_match(&TRIAL, raw),
	}
}

fn is_match(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
	pattern.as_ref().map(|re| re.is_match(text)).unwrap_or(false)
}
