pub const TEXT_VECTOR_NAME: &str = "text";
pub const IMAGE_VECTOR_NAME: &str = "image";
pub const BM25_MODEL: &str = "qdrant/bm25";

use std::{collections::HashMap, sync::Arc};

use qdrant_client::{
	Qdrant, QdrantError,
	qdrant::{
		Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Direction,
		Distance, Document, FieldType, Filter, Modifier, OrderByBuilder, PointId,
		Query, QueryBatchPointsBuilder, QueryPoints, QueryPointsBuilder, ScoredPoint,
		SparseVectorParamsBuilder, SparseVectorsConfigBuilder, Value as QdrantValue,
		VectorParamsBuilder, VectorsConfigBuilder, point_id::PointIdOptions, value::Kind,
	},
};
use serde_json::{Map, Number, Value};

use shelf_config::EmbeddingProviderConfig;
use shelf_providers::{EmbeddingInput, EmbeddingProvider};

use crate::{
	Error, Result,
	engine::{
		BoxFuture, Collection, FieldWeight, FilteredQuery, HybridQuery, META_CREATED_AT,
		META_DISTANCE, META_SCORE, NearImageQuery, RawRecord, SearchEngine, SortOrder,
	},
	fusion::{self, WeightedHits},
};

/// Keyword indexes the filtered listing depends on, plus the datetime index used for ordering.
const PAYLOAD_INDEXES: [(&str, FieldType); 3] = [
	("owner_id", FieldType::Keyword),
	("parent_id", FieldType::Keyword),
	(META_CREATED_AT, FieldType::Datetime),
];

pub struct QdrantStore {
	pub client: Qdrant,
	pub item_collection: String,
	pub container_collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &shelf_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).api_key(cfg.api_key.clone()).build()?;

		Ok(Self {
			client,
			item_collection: cfg.item_collection.clone(),
			container_collection: cfg.container_collection.clone(),
			vector_dim: cfg.vector_dim,
		})
	}

	pub fn collection_name(&self, collection: Collection) -> &str {
		match collection {
			Collection::Item => &self.item_collection,
			Collection::Container => &self.container_collection,
		}
	}
}

/// [`SearchEngine`] over Qdrant. Query text and images are embedded with the configured
/// multimodal provider; lexical matching uses server-side BM25 documents, one sparse vector per
/// weighted field (`<field>_bm25`).
pub struct QdrantEngine {
	pub store: QdrantStore,
	pub embedding: EmbeddingProviderConfig,
	pub embedder: Arc<dyn EmbeddingProvider>,
}
impl QdrantEngine {
	pub fn new(
		store: QdrantStore,
		embedding: EmbeddingProviderConfig,
		embedder: Arc<dyn EmbeddingProvider>,
	) -> Self {
		Self { store, embedding, embedder }
	}

	async fn embed_one(&self, input: EmbeddingInput) -> Result<Vec<f32>> {
		let vectors = self
			.embedder
			.embed(&self.embedding, std::slice::from_ref(&input))
			.await
			.map_err(|err| Error::Embedding { message: err.to_string() })?;
		let vector = vectors.into_iter().next().ok_or_else(|| Error::Embedding {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if vector.len() != self.store.vector_dim as usize {
			return Err(Error::Embedding {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}

	async fn run_filtered(&self, query: &FilteredQuery) -> Result<Vec<RawRecord>> {
		let collection = query.collection;
		let direction = match query.sort_order {
			SortOrder::Asc => Direction::Asc,
			SortOrder::Desc => Direction::Desc,
		};
		let order_by = OrderByBuilder::new(query.sort_by.clone()).direction(direction as i32);
		let request = QueryPointsBuilder::new(self.store.collection_name(collection))
			.query(Query::new_order_by(order_by.build()))
			.filter(equals_filter(&query.where_equals))
			.limit(query.skip as u64 + query.limit as u64)
			.with_payload(true);
		let response = self
			.store
			.client
			.query(request)
			.await
			.map_err(|err| classify(collection, err))?;

		// Qdrant does not page ordered queries by offset, so the skip is applied here.
		Ok(response
			.result
			.into_iter()
			.skip(query.skip as usize)
			.map(|point| record_from_point(point, None))
			.collect())
	}

	async fn run_near_image(&self, query: &NearImageQuery) -> Result<Vec<RawRecord>> {
		let collection = query.collection;
		let image = EmbeddingInput::image_base64(query.image_base64.clone());
		let vector = self.embed_one(image).await?;
		let request = QueryPointsBuilder::new(self.store.collection_name(collection))
			.query(Query::new_nearest(vector))
			.using(IMAGE_VECTOR_NAME)
			.filter(equals_filter(&query.where_equals))
			.limit(query.limit as u64)
			.with_payload(true);
		let response = self
			.store
			.client
			.query(request)
			.await
			.map_err(|err| classify(collection, err))?;

		// Cosine similarity comes back as the score; distance is its complement.
		Ok(response
			.result
			.into_iter()
			.map(|point| {
				let distance = 1.0 - point.score;

				record_from_point(point, Some((META_DISTANCE, distance)))
			})
			.collect())
	}

	async fn run_hybrid(&self, query: &HybridQuery) -> Result<Vec<RawRecord>> {
		let collection = query.collection;
		let name = self.store.collection_name(collection).to_string();
		let filter = equals_filter(&query.where_equals);
		let vector = self.embed_one(EmbeddingInput::text(query.text.clone())).await?;
		let mut requests: Vec<QueryPoints> = Vec::with_capacity(query.field_weights.len() + 1);

		requests.push(
			QueryPointsBuilder::new(name.clone())
				.query(Query::new_nearest(vector))
				.using(TEXT_VECTOR_NAME)
				.filter(filter.clone())
				.limit(query.limit as u64)
				.with_payload(true)
				.build(),
		);

		for field in &query.field_weights {
			requests.push(
				QueryPointsBuilder::new(name.clone())
					.query(Query::new_nearest(Document::new(query.text.clone(), BM25_MODEL)))
					.using(sparse_vector_name(&field.field))
					.filter(filter.clone())
					.limit(query.limit as u64)
					.with_payload(true)
					.build(),
			);
		}

		let response = self
			.store
			.client
			.query_batch(QueryBatchPointsBuilder::new(name, requests))
			.await
			.map_err(|err| classify(collection, err))?;
		let batches = response.result.into_iter().map(|batch| batch.result).collect();

		Ok(fuse_hybrid_batch(batches, query.alpha, &query.field_weights, query.limit))
	}

	async fn provision(&self, collection: Collection) -> Result<()> {
		let name = self.store.collection_name(collection).to_string();

		if self.store.client.collection_exists(name.clone()).await? {
			return Ok(());
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		for vector_name in [TEXT_VECTOR_NAME, IMAGE_VECTOR_NAME] {
			vectors_config.add_named_vector_params(
				vector_name,
				VectorParamsBuilder::new(self.store.vector_dim.into(), Distance::Cosine),
			);
		}

		let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();

		for field in ["name", "description"] {
			sparse_vectors_config.add_named_vector_params(
				sparse_vector_name(field),
				SparseVectorParamsBuilder::default().modifier(Modifier::Idf as i32),
			);
		}

		let created = self
			.store
			.client
			.create_collection(
				CreateCollectionBuilder::new(name.clone())
					.vectors_config(vectors_config)
					.sparse_vectors_config(sparse_vectors_config),
			)
			.await;

		tolerate_existing(created)?;

		for (field, field_type) in PAYLOAD_INDEXES {
			let indexed = self
				.store
				.client
				.create_field_index(
					CreateFieldIndexCollectionBuilder::new(name.clone(), field, field_type)
						.wait(true),
				)
				.await;

			tolerate_existing(indexed)?;
		}

		tracing::info!(
			collection = %collection,
			qdrant_collection = %name,
			"Provisioned collection."
		);

		Ok(())
	}
}
impl SearchEngine for QdrantEngine {
	fn query<'a>(&'a self, query: &'a FilteredQuery) -> BoxFuture<'a, Result<Vec<RawRecord>>> {
		Box::pin(self.run_filtered(query))
	}

	fn near_image<'a>(
		&'a self,
		query: &'a NearImageQuery,
	) -> BoxFuture<'a, Result<Vec<RawRecord>>> {
		Box::pin(self.run_near_image(query))
	}

	fn hybrid<'a>(&'a self, query: &'a HybridQuery) -> BoxFuture<'a, Result<Vec<RawRecord>>> {
		Box::pin(self.run_hybrid(query))
	}

	fn ensure_schema(&self, collection: Collection) -> BoxFuture<'_, Result<()>> {
		Box::pin(self.provision(collection))
	}
}

pub fn sparse_vector_name(field: &str) -> String {
	format!("{field}_bm25")
}

fn equals_filter(where_equals: &[(String, String)]) -> Filter {
	Filter::must(
		where_equals.iter().map(|(field, value)| Condition::matches(field.as_str(), value.clone())),
	)
}

fn classify(collection: Collection, err: QdrantError) -> Error {
	let message = err.to_string();

	if message.contains("doesn't exist") || message.contains("does not exist") {
		return Error::SchemaMissing { collection };
	}

	Error::Query { collection, message }
}

/// Fuses one hybrid batch response: the dense list first, then one BM25 list per weighted field
/// in `field_weights` order. The fused score lands in `metadata.score`.
fn fuse_hybrid_batch(
	batches: Vec<Vec<ScoredPoint>>,
	alpha: f32,
	field_weights: &[FieldWeight],
	limit: u32,
) -> Vec<RawRecord> {
	let weights = field_weights.iter().map(|field| field.weight).collect::<Vec<_>>();
	let (vector_weight, lexical_weights) = fusion::list_weights(alpha, &weights);
	let mut points: HashMap<String, ScoredPoint> = HashMap::new();
	let mut lists = Vec::with_capacity(batches.len());

	for (index, batch) in batches.into_iter().enumerate() {
		let weight = if index == 0 {
			vector_weight
		} else {
			lexical_weights.get(index - 1).copied().unwrap_or(0.0)
		};
		let mut hits = Vec::with_capacity(batch.len());

		for point in batch {
			let Some(id) = point.id.as_ref().and_then(point_id_to_string) else {
				continue;
			};

			hits.push((id.clone(), point.score));
			points.entry(id).or_insert(point);
		}

		lists.push(WeightedHits { weight, hits });
	}

	let mut fused = fusion::relative_score_fusion(&lists);

	fused.truncate(limit as usize);

	fused
		.into_iter()
		.filter_map(|(id, score)| {
			points.remove(&id).map(|point| record_from_point(point, Some((META_SCORE, score))))
		})
		.collect()
}

/// Another process may create the collection or index between the existence check and the
/// create call.
fn tolerate_existing<T>(result: std::result::Result<T, QdrantError>) -> Result<()> {
	match result {
		Ok(_) => Ok(()),
		Err(err) if is_already_exists(&err.to_string()) => {
			tracing::debug!(error = %err, "Schema object already exists.");

			Ok(())
		},
		Err(err) => Err(err.into()),
	}
}

fn is_already_exists(message: &str) -> bool {
	message.contains("already exists")
}

fn record_from_point(point: ScoredPoint, extra: Option<(&str, f32)>) -> RawRecord {
	let id = point.id.as_ref().and_then(point_id_to_string).unwrap_or_default();
	let mut properties = Map::new();
	let mut metadata = Map::new();

	for (key, value) in point.payload {
		let value = json_from_qdrant(value);

		if key == META_CREATED_AT {
			metadata.insert(key, value);
		} else {
			properties.insert(key, value);
		}
	}

	if let Some((key, score)) = extra {
		metadata.insert(
			key.to_string(),
			Number::from_f64(score as f64).map(Value::Number).unwrap_or(Value::Null),
		);
	}

	RawRecord { id, properties, metadata }
}

fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

fn json_from_qdrant(value: QdrantValue) -> Value {
	match value.kind {
		None | Some(Kind::NullValue(_)) => Value::Null,
		Some(Kind::BoolValue(value)) => Value::Bool(value),
		Some(Kind::IntegerValue(value)) => Value::from(value),
		Some(Kind::DoubleValue(value)) =>
			Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null),
		Some(Kind::StringValue(value)) => Value::String(value),
		Some(Kind::ListValue(list)) =>
			Value::Array(list.values.into_iter().map(json_from_qdrant).collect()),
		Some(Kind::StructValue(fields)) => Value::Object(
			fields.fields.into_iter().map(|(key, value)| (key, json_from_qdrant(value))).collect(),
		),
	}
}
