use serde::{Deserialize, Serialize};

use shelf_config::{List, ListPagination};
use shelf_domain::{Asset, AssetKind, ParentType};
use shelf_storage::{Collection, FilteredQuery, RawRecord, SortOrder, engine::META_CREATED_AT};

use crate::{
	CallOptions, Error, Result, ShelfService, mapper, policy::LIST_ASSETS_POLICY,
	with_schema_retry,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAssetsRequest {
	#[serde(alias = "ownerId")]
	pub owner_id: String,
	/// Defaults to `owner_id`, the domain root.
	#[serde(default, alias = "parentId")]
	pub parent_id: Option<String>,
	#[serde(default, alias = "parentType")]
	pub parent_type: Option<String>,
	#[serde(default)]
	pub skip: Option<u32>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAssetsResponse {
	pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq)]
struct ListScope {
	owner_id: String,
	parent_id: String,
	skip: u32,
	limit: u32,
}
impl ListScope {
	fn resolve(req: &ListAssetsRequest, cfg: &List) -> Result<Self> {
		let owner_id = req.owner_id.trim();

		if owner_id.is_empty() {
			return Err(Error::validation("owner_id must be non-empty."));
		}
		let parent_id = non_blank(req.parent_id.as_deref());

		if let Some(parent_type) = non_blank(req.parent_type.as_deref()) {
			let parent_type = parent_type
				.parse::<ParentType>()
				.map_err(|err| Error::validation(err.to_string()))?;

			// Only the domain root can be implied by the owner.
			if parent_type == ParentType::Container && parent_id.is_none() {
				return Err(Error::validation(
					"parent_id is required when parent_type is container.",
				));
			}
		}

		let limit = req.limit.unwrap_or(cfg.default_limit);

		if limit == 0 {
			return Err(Error::validation("limit must be greater than zero."));
		}
		if limit > cfg.max_limit {
			return Err(Error::validation(format!("limit must be at most {}.", cfg.max_limit)));
		}

		let parent_id = parent_id.unwrap_or(owner_id);

		Ok(Self {
			owner_id: owner_id.to_string(),
			parent_id: parent_id.to_string(),
			skip: req.skip.unwrap_or(0),
			limit,
		})
	}

	fn query(&self, collection: Collection, skip: u32, limit: u32) -> FilteredQuery {
		FilteredQuery {
			collection,
			where_equals: vec![
				("owner_id".to_string(), self.owner_id.clone()),
				("parent_id".to_string(), self.parent_id.clone()),
			],
			sort_by: META_CREATED_AT.to_string(),
			sort_order: SortOrder::Desc,
			limit,
			skip,
		}
	}
}

impl ShelfService {
	/// Lists the direct children of one parent, newest first.
	///
	/// Engine failures on either collection degrade to a partial listing.
	pub async fn list_assets(
		&self,
		req: ListAssetsRequest,
		opts: &CallOptions,
	) -> Result<ListAssetsResponse> {
		let scope = ListScope::resolve(&req, &self.list)?;
		let (fetch_skip, fetch_limit, window_skip) = match self.list.pagination {
			ListPagination::PerCollection => (scope.skip, scope.limit, 0),
			ListPagination::MergedWindow => (0, scope.skip.saturating_add(scope.limit), scope.skip),
		};
		let item_query = scope.query(Collection::Item, fetch_skip, fetch_limit);
		let container_query = scope.query(Collection::Container, fetch_skip, fetch_limit);
		let (items, containers) = opts
			.guard(async {
				tokio::join!(self.fetch_records(&item_query), self.fetch_records(&container_query))
			})
			.await?;
		let items = LIST_ASSETS_POLICY.settle(Collection::Item, items)?;
		let containers = LIST_ASSETS_POLICY.settle(Collection::Container, containers)?;
		let mut assets = Vec::with_capacity(items.len() + containers.len());

		for raw in &items {
			assets.push(mapper::map_asset(AssetKind::Item, raw)?);
		}
		for raw in &containers {
			assets.push(mapper::map_asset(AssetKind::Container, raw)?);
		}

		tracing::debug!(
			owner_id = %scope.owner_id,
			parent_id = %scope.parent_id,
			items = items.len(),
			containers = containers.len(),
			"Fetched assets for listing."
		);

		Ok(ListAssetsResponse {
			assets: merge_by_recency(assets, window_skip as usize, scope.limit as usize),
		})
	}

	async fn fetch_records(&self, query: &FilteredQuery) -> Result<Vec<RawRecord>> {
		let engine = self.engine.as_ref();

		with_schema_retry(engine, &self.schema_gate, query.collection, || engine.query(query))
			.await
			.map_err(|err| Error::from_engine(query.collection, err))
	}
}

/// Newest first. The sort is stable, so equal timestamps keep their input order.
pub fn merge_by_recency(mut assets: Vec<Asset>, skip: usize, limit: usize) -> Vec<Asset> {
	assets.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

	assets.into_iter().skip(skip).take(limit).collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}
