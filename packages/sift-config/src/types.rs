use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub terminology: Terminology,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub retrieval: ProviderConfig,
	pub metrics: ProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub path: String,
	/// Optional. Public backends (e.g. iCite) accept anonymous requests.
	#[serde(default)]
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Number of candidates requested from the retrieval backend per tier.
	pub batch_cap: u32,
	/// Upper bound for per-request `batch_size` overrides.
	pub max_batch_cap: u32,
	/// Tier-2 is only issued when tier-1 returns fewer candidates than this.
	pub min_tier1_results: u32,
	pub default_page_size: u32,
	pub max_page_size: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			batch_cap: 500,
			max_batch_cap: 1_000,
			min_tier1_results: 20,
			default_page_size: 10,
			max_page_size: 100,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub relevance_threshold: f32,
	pub tie_epsilon: f32,
	pub weak_match_limit: u32,
	pub weights: RankingWeights,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			relevance_threshold: 0.35,
			tie_epsilon: 0.001,
			weak_match_limit: 10,
			weights: RankingWeights::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
	pub standard: BlendWeights,
	pub recent: BlendWeights,
}
impl Default for RankingWeights {
	fn default() -> Self {
		Self {
			standard: BlendWeights {
				profile: 0.35,
				relevance: 0.35,
				influence: 0.25,
				recency: 0.05,
			},
			recent: BlendWeights { profile: 0.3, relevance: 0.3, influence: 0.2, recency: 0.2 },
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct BlendWeights {
	pub profile: f32,
	pub relevance: f32,
	pub influence: f32,
	pub recency: f32,
}
impl BlendWeights {
	pub fn sum(&self) -> f32 {
		self.profile + self.relevance + self.influence + self.recency
	}

	pub fn values(&self) -> [(&'static str, f32); 4] {
		[
			("profile", self.profile),
			("relevance", self.relevance),
			("influence", self.influence),
			("recency", self.recency),
		]
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Terminology {
	/// Extra synonyms, merged over the built-in table. Keys and values are matched
	/// case-insensitively.
	pub synonyms: BTreeMap<String, Vec<String>>,
	/// Free-text term to controlled-vocabulary descriptor.
	pub controlled_vocabulary: BTreeMap<String, String>,
	/// Terms treated as rare, highly discriminating concepts.
	pub rare_terms: Vec<String>,
}

fn default_log_level() -> String {
	"info".to_string()
}
