mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cdn, Config, EmbeddingProviderConfig, List, ListPagination, Providers, Qdrant, Search, Service,
	Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("storage.qdrant.item_collection", &cfg.storage.qdrant.item_collection),
		("storage.qdrant.container_collection", &cfg.storage.qdrant.container_collection),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.qdrant.item_collection == cfg.storage.qdrant.container_collection {
		return Err(Error::Validation {
			message: "storage.qdrant.item_collection and storage.qdrant.container_collection must differ."
				.to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if cfg.cdn.base_url.trim().is_empty() {
		return Err(Error::Validation { message: "cdn.base_url must be non-empty.".to_string() });
	}
	if cfg.list.default_limit == 0 {
		return Err(Error::Validation {
			message: "list.default_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.list.default_limit > cfg.list.max_limit {
		return Err(Error::Validation {
			message: "list.default_limit must not exceed list.max_limit.".to_string(),
		});
	}
	if cfg.list.query_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "list.query_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.search.result_limit == 0 {
		return Err(Error::Validation {
			message: "search.result_limit must be greater than zero.".to_string(),
		});
	}
	if !cfg.search.alpha.is_finite() || !(0.0..=1.0).contains(&cfg.search.alpha) {
		return Err(Error::Validation {
			message: "search.alpha must be in the range 0.0-1.0.".to_string(),
		});
	}

	for (label, weight) in [
		("search.name_weight", cfg.search.name_weight),
		("search.description_weight", cfg.search.description_weight),
	] {
		if !weight.is_finite() || weight < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number of zero or greater."),
			});
		}
	}

	if cfg.search.name_weight + cfg.search.description_weight <= 0.0 {
		return Err(Error::Validation {
			message: "search.name_weight and search.description_weight must not both be zero."
				.to_string(),
		});
	}
	if cfg.search.query_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.query_timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.storage.qdrant.api_key = None;
	}

	let trimmed = cfg.cdn.base_url.trim_end_matches('/').to_string();

	cfg.cdn.base_url = trimmed;
}
