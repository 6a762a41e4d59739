pub mod call;
pub mod list;
pub mod mapper;
pub mod policy;
pub mod search;

mod error;

pub use call::{CallOptions, SchemaGate, with_schema_retry};
pub use error::{Error, Result};
pub use list::{ListAssetsRequest, ListAssetsResponse};
pub use search::{ScoredItem, SearchItemsRequest, SearchItemsResponse};
pub use shelf_providers::ImageUrlProvider;

use std::sync::Arc;

use shelf_config::{Config, List, Search};
use shelf_storage::SearchEngine;

/// Read-side aggregation over the item and container collections.
pub struct ShelfService {
	pub list: List,
	pub search: Search,
	pub engine: Arc<dyn SearchEngine>,
	schema_gate: SchemaGate,
}
impl ShelfService {
	pub fn new(cfg: &Config, engine: Arc<dyn SearchEngine>) -> Self {
		Self::with_settings(cfg.list.clone(), cfg.search.clone(), engine)
	}

	pub fn with_settings(list: List, search: Search, engine: Arc<dyn SearchEngine>) -> Self {
		Self { list, search, engine, schema_gate: SchemaGate::default() }
	}
}
