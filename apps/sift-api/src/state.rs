use std::sync::Arc;

use sift_config::Config;
use sift_service::SiftService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SiftService>,
}
impl AppState {
	pub fn new(config: Config) -> Self {
		Self::from_service(SiftService::new(config))
	}

	pub fn from_service(service: SiftService) -> Self {
		Self { service: Arc::new(service) }
	}
}
