use std::sync::Arc;

use shelf_providers::{CdnImageUrls, HttpEmbedding};
use shelf_service::{ImageUrlProvider, ShelfService};
use shelf_storage::qdrant::{QdrantEngine, QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ShelfService>,
	pub images: Arc<dyn ImageUrlProvider>,
}
impl AppState {
	pub fn new(config: &shelf_config::Config) -> color_eyre::Result<Self> {
		let store = QdrantStore::new(&config.storage.qdrant)?;
		let engine =
			QdrantEngine::new(store, config.providers.embedding.clone(), Arc::new(HttpEmbedding));
		let service = ShelfService::new(config, Arc::new(engine));

		Ok(Self::from_parts(service, Arc::new(CdnImageUrls::new(&config.cdn))))
	}

	pub fn from_parts(service: ShelfService, images: Arc<dyn ImageUrlProvider>) -> Self {
		Self { service: Arc::new(service), images }
	}
}
