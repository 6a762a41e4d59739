use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use shelf_config::{Config, Error, ListPagination};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root.as_table_mut().expect("Template config must be a table.");
	let section = table
		.get_mut(section)
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Template config must include [{section}]."));

	section.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("shelf_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_normalizes() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = shelf_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected sample config to load.");

	assert_eq!(cfg.storage.qdrant.api_key, None);
	assert_eq!(cfg.cdn.base_url, "https://cdn.example.com/assets");
	assert_eq!(cfg.list.pagination, ListPagination::PerCollection);
	assert_eq!(cfg.search.result_limit, 10);
	assert!((cfg.search.alpha - 0.25).abs() < f32::EPSILON);
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("shelf_config_test_missing_file.toml");
	let err = shelf_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn merged_window_pagination_parses() {
	let payload = sample_toml_with("list", "pagination", Value::String("merged_window".into()));
	let path = write_temp_config(payload);
	let result = shelf_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected config to load.");

	assert_eq!(cfg.list.pagination, ListPagination::MergedWindow);
}

#[test]
fn unknown_pagination_is_a_parse_error() {
	let payload = sample_toml_with("list", "pagination", Value::String("global".into()));
	let path = write_temp_config(payload);
	let result = shelf_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn alpha_must_be_within_unit_range() {
	let payload = sample_toml_with("search", "alpha", Value::Float(1.5));
	let path = write_temp_config(payload);
	let result = shelf_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected alpha validation error.");

	assert!(
		err.to_string().contains("search.alpha must be in the range 0.0-1.0."),
		"Unexpected error: {err}"
	);
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let mut cfg = base_config();

	cfg.providers.embedding.dimensions = 512;

	let err = shelf_config::validate(&cfg).expect_err("Expected dimension validation error.");

	assert!(
		err.to_string()
			.contains("providers.embedding.dimensions must match storage.qdrant.vector_dim."),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_limit_must_not_exceed_max_limit() {
	let mut cfg = base_config();

	cfg.list.default_limit = 500;

	let err = shelf_config::validate(&cfg).expect_err("Expected limit validation error.");

	assert!(
		err.to_string().contains("list.default_limit must not exceed list.max_limit."),
		"Unexpected error: {err}"
	);
}

#[test]
fn collections_must_differ() {
	let mut cfg = base_config();

	cfg.storage.qdrant.container_collection = cfg.storage.qdrant.item_collection.clone();

	assert!(shelf_config::validate(&cfg).is_err());
}

#[test]
fn list_and_search_sections_default_when_absent() {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root.as_table_mut().expect("Template config must be a table.");

	table.remove("list");
	table.remove("search");

	let cfg: Config = toml::from_str(&toml::to_string(&root).expect("Failed to render config."))
		.expect("Failed to parse config without optional sections.");

	assert_eq!(cfg.list.default_limit, 20);
	assert_eq!(cfg.list.max_limit, 100);
	assert_eq!(cfg.list.query_timeout_ms, 10_000);
	assert_eq!(cfg.search.result_limit, 10);
	assert!((cfg.search.name_weight - 3.0).abs() < f32::EPSILON);
	assert!((cfg.search.description_weight - 2.0).abs() < f32::EPSILON);
	assert!(shelf_config::validate(&cfg).is_ok());
}

#[test]
fn list_query_timeout_must_be_positive() {
	let payload = sample_toml_with("list", "query_timeout_ms", Value::Integer(0));
	let path = write_temp_config(payload);
	let result = shelf_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected list timeout validation error.");

	assert!(
		err.to_string().contains("list.query_timeout_ms must be greater than zero."),
		"Unexpected error: {err}"
	);
}
