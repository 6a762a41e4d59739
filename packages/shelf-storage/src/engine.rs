//! The capability surface the aggregation layer needs from a vector search engine.

use std::fmt;

use serde_json::{Map, Value};

use crate::Result;

pub use shelf_providers::BoxFuture;

pub const META_CREATED_AT: &str = "created_at";
pub const META_DISTANCE: &str = "distance";
pub const META_SCORE: &str = "score";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
	Item,
	Container,
}
impl Collection {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Item => "Item",
			Self::Container => "Container",
		}
	}
}
impl fmt::Display for Collection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
	Asc,
	Desc,
}

/// A record as the engine returns it: identifier, the stored property bag, and engine-side
/// metadata such as creation time, `distance`, or `score`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
	pub id: String,
	pub properties: Map<String, Value>,
	pub metadata: Map<String, Value>,
}
impl RawRecord {
	pub fn new(id: impl Into<String>) -> Self {
		Self { id: id.into(), ..Default::default() }
	}

	pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.properties.insert(key.to_string(), value.into());

		self
	}

	pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.metadata.insert(key.to_string(), value.into());

		self
	}

	pub fn metadata_f32(&self, key: &str) -> Option<f32> {
		self.metadata.get(key).and_then(Value::as_f64).map(|value| value as f32)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredQuery {
	pub collection: Collection,
	pub where_equals: Vec<(String, String)>,
	pub sort_by: String,
	pub sort_order: SortOrder,
	pub limit: u32,
	pub skip: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearImageQuery {
	pub collection: Collection,
	pub image_base64: String,
	pub limit: u32,
	pub where_equals: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldWeight {
	pub field: String,
	pub weight: f32,
}
impl FieldWeight {
	pub fn new(field: impl Into<String>, weight: f32) -> Self {
		Self { field: field.into(), weight }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
	pub collection: Collection,
	pub text: String,
	pub field_weights: Vec<FieldWeight>,
	/// 0 ranks purely lexically, 1 purely by vector similarity.
	pub alpha: f32,
	pub limit: u32,
	pub where_equals: Vec<(String, String)>,
}

pub trait SearchEngine
where
	Self: Send + Sync,
{
	/// Equality-filtered listing with server-side ordering.
	fn query<'a>(&'a self, query: &'a FilteredQuery) -> BoxFuture<'a, Result<Vec<RawRecord>>>;

	/// Nearest neighbors of an image; every record carries `metadata.distance`.
	fn near_image<'a>(
		&'a self,
		query: &'a NearImageQuery,
	) -> BoxFuture<'a, Result<Vec<RawRecord>>>;

	/// Lexical plus vector search; every record carries `metadata.score`.
	fn hybrid<'a>(&'a self, query: &'a HybridQuery) -> BoxFuture<'a, Result<Vec<RawRecord>>>;

	fn ensure_schema(&self, collection: Collection) -> BoxFuture<'_, Result<()>>;
}
