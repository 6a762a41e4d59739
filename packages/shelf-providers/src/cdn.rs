use crate::{BoxFuture, ImageUrlProvider};

/// Builds display URLs for stored images under a CDN prefix.
#[derive(Debug, Clone)]
pub struct CdnImageUrls {
	base_url: String,
}
impl CdnImageUrls {
	pub fn new(cfg: &shelf_config::Cdn) -> Self {
		Self { base_url: cfg.base_url.trim_end_matches('/').to_string() }
	}

	pub fn image_url(&self, owner_id: &str, image_id: &str) -> Option<String> {
		let owner_id = owner_id.trim();
		let image_id = image_id.trim();

		if owner_id.is_empty() || image_id.is_empty() {
			return None;
		}

		Some(format!("{}/{owner_id}/{image_id}", self.base_url))
	}
}
impl ImageUrlProvider for CdnImageUrls {
	fn image_url<'a>(
		&'a self,
		owner_id: &'a str,
		image_id: &'a str,
	) -> BoxFuture<'a, Option<String>> {
		let url = CdnImageUrls::image_url(self, owner_id, image_id);

		Box::pin(async move { url })
	}
}
