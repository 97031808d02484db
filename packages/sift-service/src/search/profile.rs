use sift_domain::{
	Candidate, CandidateKind, Profile,
	text::{contains_word, normalize_text},
};

const CONDITIONS_WEIGHT: f32 = 0.6;
const KEYWORDS_WEIGHT: f32 = 0.3;
const LOCATION_WEIGHT: f32 = 0.1;

/// Share of the caller's profile found in the candidate, as a percentage in [0, 100]. Only the
/// components present in the profile count, and location only applies to trials that list
/// sites. Returns `None` when nothing in the profile is comparable.
pub fn match_percentage(profile: &Profile, candidate: &Candidate) -> Option<f32> {
	let text = normalize_text(&format!(
		"{} {} {} {}",
		candidate.title,
		candidate.abstract_text,
		candidate.keywords.join(" "),
		candidate.major_topics.join(" ")
	));
	let mut weighted = 0.0_f32;
	let mut total = 0.0_f32;

	if let Some(share) = share_found(&profile.conditions, &text) {
		weighted += CONDITIONS_WEIGHT * share;
		total += CONDITIONS_WEIGHT;
	}
	if let Some(share) = share_found(&profile.keywords, &text) {
		weighted += KEYWORDS_WEIGHT * share;
		total += KEYWORDS_WEIGHT;
	}
	if let Some(location) = profile.location.as_deref().map(normalize_text)
		&& !location.is_empty()
		&& candidate.kind == CandidateKind::Trial
		&& !candidate.locations.is_empty()
	{
		let found = candidate
			.locations
			.iter()
			.any(|site| contains_word(&normalize_text(site), &location));

		if found {
			weighted += LOCATION_WEIGHT;
		}

		total += LOCATION_WEIGHT;
	}

	if total <= 0.0 {
		return None;
	}

	Some((weighted / total * 100.0).clamp(0.0, 100.0))
}

fn share_found(entries: &[String], text: &str) -> Option<f32> {
	let normalized: Vec<String> = entries
		.iter()
		.map(|entry| normalize_text(entry))
		.filter(|entry| !entry.is_empty())
		.collect();

	if normalized.is_empty() {
		return None;
	}

	let found = normalized.iter().filter(|entry| contains_word(text, entry)).count();

	Some(found as f32 / normalized.len() as f32)
}
