use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub cdn: Cdn,
	#[serde(default)]
	pub list: List,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub api_key: Option<String>,
	#[serde(default = "default_item_collection")]
	pub item_collection: String,
	#[serde(default = "default_container_collection")]
	pub container_collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

/// A multimodal embedding endpoint; the same model embeds query text and query images so both
/// land in comparable vector spaces.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cdn {
	pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct List {
	pub default_limit: u32,
	pub max_limit: u32,
	pub pagination: ListPagination,
	pub query_timeout_ms: u64,
}
impl Default for List {
	fn default() -> Self {
		Self {
			default_limit: 20,
			max_limit: 100,
			pagination: ListPagination::PerCollection,
			query_timeout_ms: 10_000,
		}
	}
}

/// How `(skip, limit)` is applied when two collections are merged into one listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListPagination {
	/// Each collection is paged independently, then the merged list is cut to `limit`.
	#[default]
	PerCollection,
	/// Each collection is fetched from the start up to `skip + limit`, then the merged list is
	/// windowed globally.
	MergedWindow,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub result_limit: u32,
	pub alpha: f32,
	pub name_weight: f32,
	pub description_weight: f32,
	pub query_timeout_ms: u64,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			result_limit: 10,
			alpha: 0.25,
			name_weight: 3.0,
			description_weight: 2.0,
			query_timeout_ms: 10_000,
		}
	}
}

fn default_item_collection() -> String {
	"Item".to_string()
}

fn default_container_collection() -> String {
	"Container".to_string()
}
