pub mod cdn;
pub mod embedding;

use std::{future::Future, pin::Pin};

use color_eyre::{Result, eyre};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use shelf_config::EmbeddingProviderConfig;

pub use cdn::CdnImageUrls;
pub use embedding::EmbeddingInput;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		inputs: &'a [EmbeddingInput],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Resolves a display URL for a stored image. Signed or expiring URLs are the implementor's concern.
pub trait ImageUrlProvider
where
	Self: Send + Sync,
{
	fn image_url<'a>(&'a self, owner_id: &'a str, image_id: &'a str)
	-> BoxFuture<'a, Option<String>>;
}

/// Calls the configured HTTP embedding endpoint.
pub struct HttpEmbedding;
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		inputs: &'a [EmbeddingInput],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, inputs))
	}
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
