use std::{
	sync::Arc,
	time::{Duration, Instant},
};

use shelf_config::{List, Search};
use shelf_service::{CallOptions, Error, ScoredItem, SearchItemsRequest, ShelfService};
use shelf_storage::Collection;
use shelf_testkit::{FakeEngine, Operation, item_record, with_distance, with_score};
use tokio_util::sync::CancellationToken;

fn service(engine: &Arc<FakeEngine>) -> ShelfService {
	ShelfService::with_settings(List::default(), Search::default(), engine.clone())
}

fn request(text: Option<&str>, image: Option<&str>) -> SearchItemsRequest {
	SearchItemsRequest {
		owner_id: "owner".to_string(),
		query_text: text.map(str::to_string),
		query_image_base64: image.map(str::to_string),
	}
}

fn assert_ranking(items: &[ScoredItem], expected: &[(&str, f32)]) {
	assert_eq!(items.len(), expected.len(), "unexpected result count");

	for (hit, (id, score)) in items.iter().zip(expected) {
		assert_eq!(hit.item.header.id, *id);
		assert!((hit.score - score).abs() < 1e-5, "{id}: {} != {score}", hit.score);
	}
}

#[tokio::test]
async fn empty_query_is_rejected() {
	let engine = Arc::new(FakeEngine::new());
	let svc = service(&engine);

	for req in [request(None, None), request(Some("   "), Some(""))] {
		match svc.search_items(req, &CallOptions::default()).await {
			Err(Error::Validation { message }) => assert_eq!(
				message,
				"Either queryText or queryImageBase64 must be provided."
			),
			other => panic!("Expected a validation error, got {other:?}."),
		}
	}

	assert_eq!(engine.calls(Operation::NearImage), 0);
	assert_eq!(engine.calls(Operation::Hybrid), 0);
}

#[tokio::test]
async fn image_distance_becomes_similarity() {
	let engine = Arc::new(FakeEngine::new());

	engine.set_image_hits(vec![
		with_distance(item_record("a", "owner", 100), 0.1),
		with_distance(item_record("b", "owner", 100), 0.4),
	]);

	let response = service(&engine)
		.search_items(request(None, Some("aW1hZ2U=")), &CallOptions::default())
		.await
		.expect("Failed to search items.");

	assert_ranking(&response.items, &[("a", 0.9), ("b", 0.6)]);
	assert_eq!(engine.calls(Operation::Hybrid), 0);

	let queries = engine.near_image_queries();

	assert_eq!(queries[0].limit, 10);
	assert_eq!(queries[0].collection, Collection::Item);
	assert_eq!(queries[0].where_equals, vec![("owner_id".to_string(), "owner".to_string())]);
}

#[tokio::test]
async fn fused_results_keep_the_best_score() {
	let engine = Arc::new(FakeEngine::new());

	engine.set_image_hits(vec![
		with_distance(item_record("a", "owner", 100), 0.1),
		with_distance(item_record("b", "owner", 100), 0.5),
	]);
	engine.set_text_hits(vec![
		with_score(item_record("b", "owner", 100), 0.8),
		with_score(item_record("c", "owner", 100), 0.3),
	]);

	let response = service(&engine)
		.search_items(request(Some("drill"), Some("aW1hZ2U=")), &CallOptions::default())
		.await
		.expect("Failed to search items.");

	assert_ranking(&response.items, &[("a", 0.9), ("b", 0.8), ("c", 0.3)]);
}

#[tokio::test]
async fn text_query_uses_weighted_fields() {
	let engine = Arc::new(FakeEngine::new());

	engine.set_text_hits(vec![with_score(item_record("a", "owner", 100), 0.7)]);

	service(&engine)
		.search_items(request(Some("cordless drill"), None), &CallOptions::default())
		.await
		.expect("Failed to search items.");

	let queries = engine.hybrid_queries();
	let query = &queries[0];
	let weights = query
		.field_weights
		.iter()
		.map(|weight| (weight.field.as_str(), weight.weight))
		.collect::<Vec<_>>();

	assert_eq!(query.text, "cordless drill");
	assert_eq!(weights, vec![("name", 3.0), ("description", 2.0)]);
	assert_eq!(query.alpha, 0.25);
	assert_eq!(query.limit, 10);
	assert_eq!(engine.calls(Operation::NearImage), 0);
}

#[tokio::test]
async fn text_failure_fails_the_search() {
	let engine = Arc::new(FakeEngine::new());

	engine.set_image_hits(vec![with_distance(item_record("a", "owner", 100), 0.1)]);
	engine.fail(Operation::Hybrid);

	let result = service(&engine)
		.search_items(request(Some("drill"), Some("aW1hZ2U=")), &CallOptions::default())
		.await;

	assert!(matches!(result, Err(Error::EngineQuery { collection: Collection::Item, .. })));
}

#[tokio::test]
async fn missing_schema_is_provisioned_and_retried_once() {
	let engine = Arc::new(FakeEngine::new());

	engine.set_text_hits(vec![with_score(item_record("a", "owner", 100), 0.5)]);
	engine.drop_schema(Collection::Item);

	let response = service(&engine)
		.search_items(request(Some("drill"), None), &CallOptions::default())
		.await
		.expect("Failed to search items.");

	assert_ranking(&response.items, &[("a", 0.5)]);
	assert_eq!(engine.calls(Operation::Hybrid), 2);
	assert_eq!(engine.provisioned(), vec![Collection::Item]);
}

#[tokio::test]
async fn failed_retry_propagates() {
	let engine = Arc::new(FakeEngine::new());

	engine.drop_schema(Collection::Item);
	engine.fail(Operation::Hybrid);

	let result =
		service(&engine).search_items(request(Some("drill"), None), &CallOptions::default()).await;

	assert!(matches!(result, Err(Error::EngineQuery { .. })));
	assert_eq!(engine.calls(Operation::Hybrid), 2);
}

#[tokio::test]
async fn hit_without_relevance_is_a_mapping_error() {
	let engine = Arc::new(FakeEngine::new());

	engine.set_text_hits(vec![item_record("a", "owner", 100)]);

	let result =
		service(&engine).search_items(request(Some("drill"), None), &CallOptions::default()).await;

	assert!(matches!(result, Err(Error::Mapping { .. })));
}

#[tokio::test]
async fn cancellation_returns_no_partial_result() {
	let engine = Arc::new(FakeEngine::new().with_delay(Duration::from_secs(5)));

	engine.set_text_hits(vec![with_score(item_record("a", "owner", 100), 0.5)]);

	let cancel = CancellationToken::new();

	cancel.cancel();

	let result = service(&engine)
		.search_items(
			request(Some("drill"), None),
			&CallOptions::default().with_cancel(cancel),
		)
		.await;

	assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn concurrent_sub_queries_provision_once() {
	let engine =
		Arc::new(FakeEngine::new().with_delay(Duration::from_millis(5)).with_strict_provisioning());

	engine.set_image_hits(vec![with_distance(item_record("a", "owner", 100), 0.2)]);
	engine.set_text_hits(vec![with_score(item_record("b", "owner", 100), 0.6)]);
	engine.drop_schema(Collection::Item);

	let response = service(&engine)
		.search_items(request(Some("drill"), Some("aW1hZ2U=")), &CallOptions::default())
		.await
		.expect("Failed to search items.");

	assert_ranking(&response.items, &[("a", 0.8), ("b", 0.6)]);
	assert_eq!(engine.calls(Operation::Provision(Collection::Item)), 1);
	assert_eq!(engine.calls(Operation::NearImage), 2);
	assert_eq!(engine.calls(Operation::Hybrid), 2);
}

#[tokio::test]
async fn concurrent_requests_provision_once() {
	let engine =
		Arc::new(FakeEngine::new().with_delay(Duration::from_millis(5)).with_strict_provisioning());

	engine.set_text_hits(vec![with_score(item_record("a", "owner", 100), 0.5)]);
	engine.drop_schema(Collection::Item);

	let svc = service(&engine);
	let opts = CallOptions::default();
	let (first, second) = tokio::join!(
		svc.search_items(request(Some("drill"), None), &opts),
		svc.search_items(request(Some("ladder"), None), &opts),
	);

	assert!(first.is_ok(), "{first:?}");
	assert!(second.is_ok(), "{second:?}");
	assert_eq!(engine.calls(Operation::Provision(Collection::Item)), 1);
}

#[tokio::test]
async fn image_and_text_queries_overlap() {
	let engine = Arc::new(FakeEngine::new().with_delay(Duration::from_millis(200)));

	engine.set_image_hits(vec![with_distance(item_record("a", "owner", 100), 0.2)]);
	engine.set_text_hits(vec![with_score(item_record("b", "owner", 100), 0.6)]);

	let started = Instant::now();

	service(&engine)
		.search_items(request(Some("drill"), Some("aW1hZ2U=")), &CallOptions::default())
		.await
		.expect("Failed to search items.");

	assert!(started.elapsed() < Duration::from_millis(380), "took {:?}", started.elapsed());
}
