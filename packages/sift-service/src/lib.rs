pub mod error;
pub mod search;

pub use error::{Error, Result};
pub use search::{
	Degradation, ExposureMatch, GateOutcome, RankedResult, SearchRequest, SearchResponse,
	SearchTrace, SignalBag,
};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use sift_config::{Config, ProviderConfig};
use sift_domain::{CandidateMetrics, StaticTerminology, Terminology};
use sift_providers::{
	metrics,
	retrieval::{self, FetchPage, FetchRequest},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait RetrievalProvider
where
	Self: Send + Sync,
{
	fn fetch_candidates<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		req: &'a FetchRequest,
	) -> BoxFuture<'a, sift_providers::Result<FetchPage>>;
}

pub trait MetricsProvider
where
	Self: Send + Sync,
{
	fn fetch_metrics<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ids: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<HashMap<String, CandidateMetrics>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub retrieval: Arc<dyn RetrievalProvider>,
	pub metrics: Arc<dyn MetricsProvider>,
}
impl Providers {
	pub fn new(retrieval: Arc<dyn RetrievalProvider>, metrics: Arc<dyn MetricsProvider>) -> Self {
		Self { retrieval, metrics }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { retrieval: provider.clone(), metrics: provider }
	}
}

/// Immutable after construction; share it behind an `Arc` across requests.
pub struct SiftService {
	pub cfg: Config,
	pub providers: Providers,
	pub terminology: Arc<dyn Terminology>,
}
impl SiftService {
	pub fn new(cfg: Config) -> Self {
		Self::with_providers(cfg, Providers::default())
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		let terminology = Arc::new(StaticTerminology::from_config(&cfg.terminology));

		Self { cfg, providers, terminology }
	}

	pub fn with_terminology(mut self, terminology: Arc<dyn Terminology>) -> Self {
		self.terminology = terminology;

		self
	}
}

struct DefaultProviders;
impl RetrievalProvider for DefaultProviders {
	fn fetch_candidates<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		req: &'a FetchRequest,
	) -> BoxFuture<'a, sift_providers::Result<FetchPage>> {
		Box::pin(retrieval::fetch_candidates(cfg, req))
	}
}
impl MetricsProvider for DefaultProviders {
	fn fetch_metrics<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ids: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<HashMap<String, CandidateMetrics>>> {
		Box::pin(metrics::fetch_metrics(cfg, ids))
	}
}
