//! In-memory fixtures for exercising the search pipeline without network access.

use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Map;

use sift_config::{Config, ProviderConfig, Providers, Ranking, Search, Service, Terminology};
use sift_domain::{Candidate, CandidateKind, CandidateMetrics};
use sift_providers::{
	Error as ProviderError, Result as ProviderResult,
	retrieval::{FetchPage, FetchRequest},
};
use sift_service::{BoxFuture, MetricsProvider, RetrievalProvider};

/// How a scripted backend should fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
	/// Recoverable: the coordinator treats the call as empty.
	Unavailable,
	/// Credential rejection: the request is aborted.
	Fatal,
}
impl Failure {
	fn to_error(self) -> ProviderError {
		match self {
			Self::Unavailable => ProviderError::InvalidResponse {
				message: "Scripted backend is unavailable.".to_string(),
			},
			Self::Fatal => ProviderError::Unauthorized { status: 401 },
		}
	}
}

#[derive(Clone, Debug)]
enum Scripted {
	Page(FetchPage),
	Fail(Failure),
}

pub fn sample_provider(provider_id: &str) -> ProviderConfig {
	ProviderConfig {
		provider_id: provider_id.to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		path: format!("/{provider_id}"),
		api_key: None,
		timeout_ms: 200,
		default_headers: Map::new(),
	}
}

/// A valid configuration with default search and ranking policy.
pub fn sample_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		providers: Providers {
			retrieval: sample_provider("retrieval"),
			metrics: sample_provider("metrics"),
		},
		search: Search::default(),
		ranking: Ranking::default(),
		terminology: Terminology::default(),
	}
}

#[derive(Clone, Debug)]
pub struct CandidateBuilder {
	candidate: Candidate,
}
impl CandidateBuilder {
	pub fn new(id: impl Into<String>) -> Self {
		Self { candidate: Candidate { id: id.into(), ..Default::default() } }
	}

	pub fn title(mut self, title: &str) -> Self {
		self.candidate.title = title.to_string();

		self
	}

	pub fn abstract_text(mut self, text: &str) -> Self {
		self.candidate.abstract_text = text.to_string();

		self
	}

	pub fn keywords(mut self, keywords: &[&str]) -> Self {
		self.candidate.keywords = keywords.iter().map(|value| value.to_string()).collect();

		self
	}

	pub fn major_topics(mut self, topics: &[&str]) -> Self {
		self.candidate.major_topics = topics.iter().map(|value| value.to_string()).collect();

		self
	}

	pub fn year(mut self, year: i32) -> Self {
		self.candidate.year = Some(year);

		self
	}

	pub fn citations(mut self, count: u32) -> Self {
		self.candidate.citation_count = count;

		self
	}

	pub fn impact(mut self, impact: f32) -> Self {
		self.candidate.impact = Some(impact);

		self
	}

	pub fn trial(mut self, status: &str, phase: &str, locations: &[&str]) -> Self {
		self.candidate.kind = CandidateKind::Trial;
		self.candidate.status = Some(status.to_string());
		self.candidate.phase = Some(phase.to_string());
		self.candidate.locations = locations.iter().map(|value| value.to_string()).collect();

		self
	}

	pub fn build(self) -> Candidate {
		self.candidate
	}
}

/// Retrieval backend answering from a per-query script. Unscripted queries return an empty
/// page unless a default was set.
#[derive(Debug, Default)]
pub struct ScriptedRetrieval {
	scripts: HashMap<String, Scripted>,
	default: Option<Scripted>,
	delay: Option<Duration>,
	delays: HashMap<String, Duration>,
	calls: Mutex<Vec<FetchRequest>>,
}
impl ScriptedRetrieval {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_page(mut self, query: &str, items: Vec<Candidate>, total_count: u64) -> Self {
		self.scripts.insert(query.to_string(), Scripted::Page(FetchPage { items, total_count }));

		self
	}

	pub fn with_default_page(mut self, items: Vec<Candidate>, total_count: u64) -> Self {
		self.default = Some(Scripted::Page(FetchPage { items, total_count }));

		self
	}

	pub fn with_failure(mut self, query: &str, failure: Failure) -> Self {
		self.scripts.insert(query.to_string(), Scripted::Fail(failure));

		self
	}

	pub fn with_default_failure(mut self, failure: Failure) -> Self {
		self.default = Some(Scripted::Fail(failure));

		self
	}

	/// Every call sleeps this long before answering.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	/// Calls for `query` sleep this long, overriding the global delay.
	pub fn with_delay_for(mut self, query: &str, delay: Duration) -> Self {
		self.delays.insert(query.to_string(), delay);

		self
	}

	pub fn calls(&self) -> Vec<FetchRequest> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn queries(&self) -> Vec<String> {
		self.calls().into_iter().map(|call| call.query).collect()
	}
}
impl RetrievalProvider for ScriptedRetrieval {
	fn fetch_candidates<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		req: &'a FetchRequest,
	) -> BoxFuture<'a, ProviderResult<FetchPage>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).push(req.clone());

		let scripted = self.scripts.get(&req.query).or(self.default.as_ref()).cloned();
		let delay = self.delays.get(&req.query).copied().or(self.delay);

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			match scripted {
				Some(Scripted::Page(mut page)) => {
					page.items.truncate(req.page_size as usize);

					Ok(page)
				},
				Some(Scripted::Fail(failure)) => Err(failure.to_error()),
				None => Ok(FetchPage::default()),
			}
		})
	}
}

/// Metrics backend answering from a fixed table.
#[derive(Debug, Default)]
pub struct ScriptedMetrics {
	metrics: HashMap<String, CandidateMetrics>,
	failure: Option<Failure>,
	delay: Option<Duration>,
	calls: AtomicUsize,
}
impl ScriptedMetrics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_metrics(mut self, id: &str, citation_count: u32, impact: Option<f32>) -> Self {
		self.metrics.insert(id.to_string(), CandidateMetrics { citation_count, impact });

		self
	}

	pub fn with_failure(mut self, failure: Failure) -> Self {
		self.failure = Some(failure);

		self
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl MetricsProvider for ScriptedMetrics {
	fn fetch_metrics<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		ids: &'a [String],
	) -> BoxFuture<'a, ProviderResult<HashMap<String, CandidateMetrics>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}
			if let Some(failure) = self.failure {
				return Err(failure.to_error());
			}

			Ok(ids
				.iter()
				.filter_map(|id| self.metrics.get(id).map(|entry| (id.clone(), *entry)))
				.collect())
		})
	}
}
