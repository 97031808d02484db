mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	BlendWeights, Config, ProviderConfig, Providers, Ranking, RankingWeights, Search, Service,
	Terminology,
};

use std::{
	fs,
	path::{Path, PathBuf},
};

const MAX_BATCH_CAP_LIMIT: u32 = 1_000;
const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: PathBuf::from("<inline>"), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::invalid("service.http_bind", "must be non-empty."));
	}

	for (label, provider) in [
		("providers.retrieval", &cfg.providers.retrieval),
		("providers.metrics", &cfg.providers.metrics),
	] {
		if provider.api_base.trim().is_empty() {
			return Err(Error::invalid(format!("{label}.api_base"), "must be non-empty."));
		}
		if provider.timeout_ms == 0 {
			return Err(Error::invalid(format!("{label}.timeout_ms"), "must be greater than zero."));
		}
		if provider.default_headers.values().any(|value| !value.is_string()) {
			return Err(Error::invalid(
				format!("{label}.default_headers"),
				"values must be strings.",
			));
		}
	}

	let search = &cfg.search;

	if search.max_batch_cap == 0 || search.max_batch_cap > MAX_BATCH_CAP_LIMIT {
		return Err(Error::invalid(
			"search.max_batch_cap",
			format!("must be in the range 1-{MAX_BATCH_CAP_LIMIT}."),
		));
	}
	if search.batch_cap == 0 {
		return Err(Error::invalid("search.batch_cap", "must be greater than zero."));
	}
	if search.batch_cap > search.max_batch_cap {
		return Err(Error::invalid("search.batch_cap", "must not exceed search.max_batch_cap."));
	}
	if search.min_tier1_results == 0 {
		return Err(Error::invalid("search.min_tier1_results", "must be greater than zero."));
	}
	if search.default_page_size == 0 || search.max_page_size == 0 {
		return Err(Error::invalid(
			"search.default_page_size",
			"page sizes must be greater than zero.",
		));
	}
	if search.default_page_size > search.max_page_size {
		return Err(Error::invalid(
			"search.default_page_size",
			"must not exceed search.max_page_size.",
		));
	}

	let ranking = &cfg.ranking;

	if !ranking.relevance_threshold.is_finite()
		|| !(0.0..=1.0).contains(&ranking.relevance_threshold)
	{
		return Err(Error::invalid("ranking.relevance_threshold", "must be in the range 0.0-1.0."));
	}
	if !ranking.tie_epsilon.is_finite() || ranking.tie_epsilon <= 0.0 || ranking.tie_epsilon > 0.1 {
		return Err(Error::invalid("ranking.tie_epsilon", "must be in the range (0.0, 0.1]."));
	}

	for (label, weights) in [
		("ranking.weights.standard", &ranking.weights.standard),
		("ranking.weights.recent", &ranking.weights.recent),
	] {
		for (name, value) in weights.values() {
			if !value.is_finite() || !(0.0..=1.0).contains(&value) {
				return Err(Error::invalid(
					format!("{label}.{name}"),
					"must be in the range 0.0-1.0.",
				));
			}
		}

		if (weights.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
			return Err(Error::invalid(label, "must sum to 1.0."));
		}
	}

	for (term, synonyms) in &cfg.terminology.synonyms {
		if term.trim().is_empty() || synonyms.iter().any(|value| value.trim().is_empty()) {
			return Err(Error::invalid("terminology.synonyms", "entries must be non-empty."));
		}
	}
	for (term, descriptor) in &cfg.terminology.controlled_vocabulary {
		if term.trim().is_empty() || descriptor.trim().is_empty() {
			return Err(Error::invalid(
				"terminology.controlled_vocabulary",
				"entries must be non-empty.",
			));
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for provider in [&mut cfg.providers.retrieval, &mut cfg.providers.metrics] {
		if provider.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			provider.api_key = None;
		}

		provider.api_base = provider.api_base.trim_end_matches('/').to_string();
	}

	cfg.terminology.rare_terms.retain(|term| !term.trim().is_empty());
}
