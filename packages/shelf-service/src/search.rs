use std::collections::{HashMap, hash_map::Entry};

use serde::{Deserialize, Serialize};

use shelf_domain::Item;
use shelf_storage::{Collection, FieldWeight, HybridQuery, NearImageQuery, RawRecord};

use crate::{
	CallOptions, Error, Result, ShelfService, mapper,
	policy::{Relevance, SEARCH_ITEMS_POLICY},
	with_schema_retry,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchItemsRequest {
	#[serde(alias = "ownerId")]
	pub owner_id: String,
	#[serde(default, alias = "queryText")]
	pub query_text: Option<String>,
	#[serde(default, alias = "queryImageBase64")]
	pub query_image_base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
	#[serde(flatten)]
	pub item: Item,
	pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItemsResponse {
	pub items: Vec<ScoredItem>,
}

impl ShelfService {
	/// Image similarity and weighted text relevance over one owner's items, fused per item by the
	/// better of the two scores.
	pub async fn search_items(
		&self,
		req: SearchItemsRequest,
		opts: &CallOptions,
	) -> Result<SearchItemsResponse> {
		let owner_id = req.owner_id.trim();

		if owner_id.is_empty() {
			return Err(Error::validation("owner_id must be non-empty."));
		}

		let text = non_blank(req.query_text);
		let image = non_blank(req.query_image_base64);

		if text.is_none() && image.is_none() {
			return Err(Error::validation(
				"Either queryText or queryImageBase64 must be provided.",
			));
		}

		let where_equals = vec![("owner_id".to_string(), owner_id.to_string())];
		let image_query = image.map(|image_base64| NearImageQuery {
			collection: Collection::Item,
			image_base64,
			limit: self.search.result_limit,
			where_equals: where_equals.clone(),
		});
		let text_query = text.map(|text| HybridQuery {
			collection: Collection::Item,
			text,
			field_weights: vec![
				FieldWeight::new("name", self.search.name_weight),
				FieldWeight::new("description", self.search.description_weight),
			],
			alpha: self.search.alpha,
			limit: self.search.result_limit,
			where_equals,
		});
		let (image_hits, text_hits) = opts
			.guard(async {
				tokio::try_join!(
					async {
						SEARCH_ITEMS_POLICY.settle(
							Collection::Item,
							self.near_image_records(image_query.as_ref()).await,
						)
					},
					async {
						SEARCH_ITEMS_POLICY
							.settle(Collection::Item, self.hybrid_records(text_query.as_ref()).await)
					},
				)
			})
			.await??;
		let mut scored = Vec::with_capacity(image_hits.len() + text_hits.len());

		for raw in &image_hits {
			scored.push(score_hit(raw, Relevance::from_distance(raw)?)?);
		}
		for raw in &text_hits {
			scored.push(score_hit(raw, Relevance::from_score(raw)?)?);
		}

		let items = fuse_max(scored);

		tracing::debug!(
			owner_id = %owner_id,
			image_hits = image_hits.len(),
			text_hits = text_hits.len(),
			results = items.len(),
			"Fused item search results."
		);

		Ok(SearchItemsResponse { items })
	}

	async fn near_image_records(&self, query: Option<&NearImageQuery>) -> Result<Vec<RawRecord>> {
		let Some(query) = query else {
			return Ok(Vec::new());
		};
		let engine = self.engine.as_ref();

		with_schema_retry(engine, &self.schema_gate, query.collection, || engine.near_image(query))
			.await
			.map_err(|err| Error::from_engine(query.collection, err))
	}

	async fn hybrid_records(&self, query: Option<&HybridQuery>) -> Result<Vec<RawRecord>> {
		let Some(query) = query else {
			return Ok(Vec::new());
		};
		let engine = self.engine.as_ref();

		with_schema_retry(engine, &self.schema_gate, query.collection, || engine.hybrid(query))
			.await
			.map_err(|err| Error::from_engine(query.collection, err))
	}
}

/// One entry per item, keeping its highest score. Sorted by score descending, then id ascending.
pub fn fuse_max(scored: impl IntoIterator<Item = ScoredItem>) -> Vec<ScoredItem> {
	let mut best: HashMap<String, ScoredItem> = HashMap::new();

	for candidate in scored {
		match best.entry(candidate.item.header.id.clone()) {
			Entry::Occupied(mut slot) =>
				if candidate.score > slot.get().score {
					slot.insert(candidate);
				},
			Entry::Vacant(slot) => {
				slot.insert(candidate);
			},
		}
	}

	let mut fused = best.into_values().collect::<Vec<_>>();

	fused.sort_by(|a, b| {
		b.score.total_cmp(&a.score).then_with(|| a.item.header.id.cmp(&b.item.header.id))
	});

	fused
}

fn score_hit(raw: &RawRecord, relevance: Relevance) -> Result<ScoredItem> {
	Ok(ScoredItem { item: mapper::map_record(raw)?, score: relevance.normalized_score() })
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.trim().is_empty())
}
