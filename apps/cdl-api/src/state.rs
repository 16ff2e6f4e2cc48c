use std::sync::Arc;

use cdl_service::{CdlService, Providers};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CdlService>,
}
impl AppState {
	pub async fn new(config: cdl_config::Config) -> color_eyre::Result<Self> {
		let service = CdlService::connect(config, Providers::default()).await?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: CdlService) -> Self {
		Self { service: Arc::new(service) }
	}
}
