mod error;

pub use error::{Error, Result};

use std::{
	collections::{HashMap, HashSet},
	env,
	sync::Mutex,
	time::Duration,
};

use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use shelf_storage::{
	BoxFuture, Collection, FilteredQuery, HybridQuery, NearImageQuery, RawRecord, SearchEngine,
	SortOrder,
	engine::{META_CREATED_AT, META_DISTANCE, META_SCORE},
	qdrant::QdrantStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	Query(Collection),
	NearImage,
	Hybrid,
	Provision(Collection),
}

#[derive(Default)]
struct FakeState {
	records: HashMap<Collection, Vec<RawRecord>>,
	image_hits: Vec<RawRecord>,
	text_hits: Vec<RawRecord>,
	failing: HashSet<Operation>,
	missing_schema: HashSet<Collection>,
	strict_provisioning: bool,
	provisioned: Vec<Collection>,
	calls: HashMap<Operation, usize>,
	filtered_queries: Vec<FilteredQuery>,
	hybrid_queries: Vec<HybridQuery>,
	near_image_queries: Vec<NearImageQuery>,
}

/// In-memory [`SearchEngine`] with failure injection.
///
/// Filtered queries honor `where_equals`, ordering on `created_at`, `skip`, and `limit`.
/// Image and text hits are returned as configured, cut to the requested limit.
#[derive(Default)]
pub struct FakeEngine {
	state: Mutex<FakeState>,
	delay: Option<Duration>,
}
impl FakeEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every call sleeps this long before answering.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn insert(&self, collection: Collection, record: RawRecord) {
		self.with_state(|state| state.records.entry(collection).or_default().push(record));
	}

	pub fn set_image_hits(&self, hits: Vec<RawRecord>) {
		self.with_state(|state| state.image_hits = hits);
	}

	pub fn set_text_hits(&self, hits: Vec<RawRecord>) {
		self.with_state(|state| state.text_hits = hits);
	}

	pub fn fail(&self, operation: Operation) {
		self.with_state(|state| {
			state.failing.insert(operation);
		});
	}

	/// `ensure_schema` fails for a collection that already exists, as a plain create would.
	pub fn with_strict_provisioning(self) -> Self {
		self.with_state(|state| state.strict_provisioning = true);

		self
	}

	/// The collection reports a missing schema until `ensure_schema` runs for it.
	pub fn drop_schema(&self, collection: Collection) {
		self.with_state(|state| {
			state.missing_schema.insert(collection);
		});
	}

	pub fn calls(&self, operation: Operation) -> usize {
		self.with_state(|state| state.calls.get(&operation).copied().unwrap_or(0))
	}

	pub fn provisioned(&self) -> Vec<Collection> {
		self.with_state(|state| state.provisioned.clone())
	}

	pub fn filtered_queries(&self) -> Vec<FilteredQuery> {
		self.with_state(|state| state.filtered_queries.clone())
	}

	pub fn hybrid_queries(&self) -> Vec<HybridQuery> {
		self.with_state(|state| state.hybrid_queries.clone())
	}

	pub fn near_image_queries(&self) -> Vec<NearImageQuery> {
		self.with_state(|state| state.near_image_queries.clone())
	}

	fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
		let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());

		f(&mut state)
	}

	async fn pause(&self) {
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
	}

	/// Counts the call, then applies injected failures.
	fn begin(&self, operation: Operation, collection: Collection) -> shelf_storage::Result<()> {
		self.with_state(|state| {
			*state.calls.entry(operation).or_insert(0) += 1;

			if state.missing_schema.contains(&collection) {
				return Err(shelf_storage::Error::SchemaMissing { collection });
			}
			if state.failing.contains(&operation) {
				return Err(shelf_storage::Error::Query {
					collection,
					message: "injected failure".to_string(),
				});
			}

			Ok(())
		})
	}

	async fn run_query(&self, query: &FilteredQuery) -> shelf_storage::Result<Vec<RawRecord>> {
		self.pause().await;
		self.begin(Operation::Query(query.collection), query.collection)?;

		self.with_state(|state| {
			state.filtered_queries.push(query.clone());

			let mut matched = state
				.records
				.get(&query.collection)
				.map(|records| {
					records
						.iter()
						.filter(|record| matches_filter(record, &query.where_equals))
						.cloned()
						.collect::<Vec<_>>()
				})
				.unwrap_or_default();

			matched.sort_by(|a, b| {
				let ordering = created_at(a, &query.sort_by).cmp(&created_at(b, &query.sort_by));

				match query.sort_order {
					SortOrder::Asc => ordering,
					SortOrder::Desc => ordering.reverse(),
				}
			});

			Ok(matched
				.into_iter()
				.skip(query.skip as usize)
				.take(query.limit as usize)
				.collect())
		})
	}

	async fn run_near_image(
		&self,
		query: &NearImageQuery,
	) -> shelf_storage::Result<Vec<RawRecord>> {
		self.pause().await;
		self.begin(Operation::NearImage, query.collection)?;

		self.with_state(|state| {
			state.near_image_queries.push(query.clone());

			Ok(state.image_hits.iter().take(query.limit as usize).cloned().collect())
		})
	}

	async fn run_hybrid(&self, query: &HybridQuery) -> shelf_storage::Result<Vec<RawRecord>> {
		self.pause().await;
		self.begin(Operation::Hybrid, query.collection)?;

		self.with_state(|state| {
			state.hybrid_queries.push(query.clone());

			Ok(state.text_hits.iter().take(query.limit as usize).cloned().collect())
		})
	}
}
impl SearchEngine for FakeEngine {
	fn query<'a>(
		&'a self,
		query: &'a FilteredQuery,
	) -> BoxFuture<'a, shelf_storage::Result<Vec<RawRecord>>> {
		Box::pin(self.run_query(query))
	}

	fn near_image<'a>(
		&'a self,
		query: &'a NearImageQuery,
	) -> BoxFuture<'a, shelf_storage::Result<Vec<RawRecord>>> {
		Box::pin(self.run_near_image(query))
	}

	fn hybrid<'a>(
		&'a self,
		query: &'a HybridQuery,
	) -> BoxFuture<'a, shelf_storage::Result<Vec<RawRecord>>> {
		Box::pin(self.run_hybrid(query))
	}

	fn ensure_schema(&self, collection: Collection) -> BoxFuture<'_, shelf_storage::Result<()>> {
		Box::pin(async move {
			self.pause().await;
			self.with_state(|state| {
				*state.calls.entry(Operation::Provision(collection)).or_insert(0) += 1;

				if state.strict_provisioning && !state.missing_schema.contains(&collection) {
					return Err(shelf_storage::Error::Query {
						collection,
						message: "Collection already exists".to_string(),
					});
				}

				state.missing_schema.remove(&collection);
				state.provisioned.push(collection);

				Ok(())
			})
		})
	}
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("SHELF_QDRANT_URL").ok()
}

/// Qdrant settings with collection names unique to one test run.
pub fn live_qdrant_config(url: String, vector_dim: u32) -> shelf_config::Qdrant {
	let suffix = OffsetDateTime::now_utc().unix_timestamp_nanos();

	shelf_config::Qdrant {
		url,
		api_key: None,
		item_collection: format!("shelf_test_items_{suffix}"),
		container_collection: format!("shelf_test_containers_{suffix}"),
		vector_dim,
	}
}

pub async fn drop_collections(store: &QdrantStore) -> Result<()> {
	for name in [&store.item_collection, &store.container_collection] {
		let exists = store.client.collection_exists(name.clone()).await.map_err(|err| {
			Error::Message(format!("Failed to check collection {name:?}: {err}."))
		})?;

		if !exists {
			continue;
		}

		store
			.client
			.delete_collection(name.clone())
			.await
			.map_err(|err| Error::Message(format!("Failed to delete collection {name:?}: {err}.")))?;
	}

	Ok(())
}

/// A stored item record shaped the way the engine returns it.
pub fn item_record(id: &str, owner_id: &str, created_at_secs: i64) -> RawRecord {
	RawRecord::new(id)
		.with_property("owner_id", owner_id)
		.with_property("name", format!("Item {id}"))
		.with_property("description", "")
		.with_property("type", "item")
		.with_property("parent_id", owner_id)
		.with_property("parent_type", "domain_root")
		.with_property("quantity", 1)
		.with_property("files", Value::Array(Vec::new()))
		.with_metadata(META_CREATED_AT, rfc3339(created_at_secs))
}

pub fn container_record(id: &str, owner_id: &str, created_at_secs: i64) -> RawRecord {
	RawRecord::new(id)
		.with_property("owner_id", owner_id)
		.with_property("name", format!("Container {id}"))
		.with_property("description", "")
		.with_property("type", "container")
		.with_property("parent_id", owner_id)
		.with_property("parent_type", "domain_root")
		.with_property("child_count", 0)
		.with_property("path", "/")
		.with_metadata(META_CREATED_AT, rfc3339(created_at_secs))
}

pub fn with_distance(record: RawRecord, distance: f32) -> RawRecord {
	record.with_metadata(META_DISTANCE, distance as f64)
}

pub fn with_score(record: RawRecord, score: f32) -> RawRecord {
	record.with_metadata(META_SCORE, score as f64)
}

pub fn rfc3339(unix_secs: i64) -> String {
	OffsetDateTime::from_unix_timestamp(unix_secs)
		.ok()
		.and_then(|ts| ts.format(&Rfc3339).ok())
		.unwrap_or_default()
}

fn matches_filter(record: &RawRecord, where_equals: &[(String, String)]) -> bool {
	where_equals.iter().all(|(field, expected)| {
		record.properties.get(field).and_then(Value::as_str) == Some(expected.as_str())
	})
}

fn created_at(record: &RawRecord, key: &str) -> Option<OffsetDateTime> {
	record
		.metadata
		.get(key)
		.or_else(|| record.properties.get(key))
		.and_then(Value::as_str)
		.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
}
