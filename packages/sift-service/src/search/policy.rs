use serde_json::Value;

use sift_config::{BlendWeights, Config};

/// Everything in the configuration that can change an ordering, in a stable JSON shape.
pub fn build_policy_snapshot(cfg: &Config) -> Value {
	serde_json::json!({
		"search": {
			"batch_cap": cfg.search.batch_cap,
			"max_batch_cap": cfg.search.max_batch_cap,
			"min_tier1_results": cfg.search.min_tier1_results,
		},
		"ranking": {
			"relevance_threshold": cfg.ranking.relevance_threshold,
			"tie_epsilon": cfg.ranking.tie_epsilon,
			"weak_match_limit": cfg.ranking.weak_match_limit,
			"weights": {
				"standard": weights_json(&cfg.ranking.weights.standard),
				"recent": weights_json(&cfg.ranking.weights.recent),
			},
		},
		"terminology": {
			"synonyms": cfg.terminology.synonyms,
			"controlled_vocabulary": cfg.terminology.controlled_vocabulary,
			"rare_terms": cfg.terminology.rare_terms,
		},
	})
}

pub fn hash_policy_snapshot(payload: &Value) -> String {
	blake3::hash(payload.to_string().as_bytes()).to_hex().to_string()
}

fn weights_json(weights: &BlendWeights) -> Value {
	let mut out = serde_json::Map::new();

	for (name, value) in weights.values() {
		out.insert(name.to_string(), serde_json::json!(value));
	}

	Value::Object(out)
}
