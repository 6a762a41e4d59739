use std::time::Duration;

use axum::{
	Json, Router,
	extract::{Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use uuid::Uuid;

use shelf_domain::Asset;
use shelf_service::{
	CallOptions, Error as ServiceError, ImageUrlProvider, ListAssetsRequest, ScoredItem,
	SearchItemsRequest,
};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AssetView {
	#[serde(flatten)]
	pub asset: Asset,
	pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListAssetsBody {
	pub assets: Vec<AssetView>,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
	#[serde(flatten)]
	pub item: ScoredItem,
	pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchItemsBody {
	pub items: Vec<ItemView>,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/assets", get(list_assets))
		.route("/v1/items/search", post(search_items))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn list_assets(
	State(state): State<AppState>,
	Query(payload): Query<ListAssetsRequest>,
) -> Result<Json<ListAssetsBody>, ApiError> {
	let request_id = Uuid::new_v4();
	let opts =
		CallOptions::with_timeout(Duration::from_millis(state.service.list.query_timeout_ms));

	tracing::debug!(%request_id, owner_id = %payload.owner_id, "Listing assets.");

	let response = state.service.list_assets(payload, &opts).await.inspect_err(|err| {
		tracing::warn!(%request_id, error = %err, "Asset listing failed.");
	})?;
	let mut assets = Vec::with_capacity(response.assets.len());

	for asset in response.assets {
		let header = asset.header();
		let image_url =
			resolve_image_url(state.images.as_ref(), &header.owner_id, header.image_id.as_deref())
				.await;

		assets.push(AssetView { asset, image_url });
	}

	Ok(Json(ListAssetsBody { assets }))
}

async fn search_items(
	State(state): State<AppState>,
	Json(payload): Json<SearchItemsRequest>,
) -> Result<Json<SearchItemsBody>, ApiError> {
	let request_id = Uuid::new_v4();
	let opts =
		CallOptions::with_timeout(Duration::from_millis(state.service.search.query_timeout_ms));

	tracing::debug!(%request_id, owner_id = %payload.owner_id, "Searching items.");

	let response = state.service.search_items(payload, &opts).await.inspect_err(|err| {
		tracing::warn!(%request_id, error = %err, "Item search failed.");
	})?;
	let mut items = Vec::with_capacity(response.items.len());

	for item in response.items {
		let header = &item.item.header;
		let image_url =
			resolve_image_url(state.images.as_ref(), &header.owner_id, header.image_id.as_deref())
				.await;

		items.push(ItemView { item, image_url });
	}

	Ok(Json(SearchItemsBody { items }))
}

async fn resolve_image_url(
	images: &dyn ImageUrlProvider,
	owner_id: &str,
	image_id: Option<&str>,
) -> Option<String> {
	images.image_url(owner_id, image_id?).await
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::Validation { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::EngineQuery { .. } | ServiceError::SchemaMissing { .. } =>
				ApiError::new(StatusCode::BAD_GATEWAY, "engine_error", message),
			ServiceError::Mapping { .. } =>
				ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "mapping_error", message),
			ServiceError::Cancelled =>
				ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "cancelled", message),
			ServiceError::DeadlineExceeded =>
				ApiError::new(StatusCode::GATEWAY_TIMEOUT, "deadline_exceeded", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
