//! Turns engine records into domain entities.
//!
//! A record is flattened into one JSON object (engine metadata overrides stored properties, the
//! engine identifier overrides both), cut down to the fields the target type declares, and then
//! deserialized. Nulls are treated as absent so serde defaults apply. Required fields are never
//! invented; a record missing one fails to map.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use shelf_domain::{Asset, AssetHeader, AssetKind, Container, DeclaredFields, Item};
use shelf_storage::RawRecord;

use crate::{Error, Result};

pub trait EntityShape
where
	Self: DeclaredFields + DeserializeOwned,
{
	fn header(&self) -> &AssetHeader;
}
impl EntityShape for Item {
	fn header(&self) -> &AssetHeader {
		&self.header
	}
}
impl EntityShape for Container {
	fn header(&self) -> &AssetHeader {
		&self.header
	}
}

pub fn map_record<T>(raw: &RawRecord) -> Result<T>
where
	T: EntityShape,
{
	let flat = flatten(raw, T::FIELDS);
	let entity: T = serde_json::from_value(Value::Object(flat))
		.map_err(|err| Error::Mapping { id: raw.id.clone(), message: err.to_string() })?;

	entity
		.header()
		.check_parent()
		.map_err(|err| Error::Mapping { id: raw.id.clone(), message: err.to_string() })?;

	Ok(entity)
}

pub fn map_asset(kind: AssetKind, raw: &RawRecord) -> Result<Asset> {
	match kind {
		AssetKind::Item => map_record::<Item>(raw).map(Asset::Item),
		AssetKind::Container => map_record::<Container>(raw).map(Asset::Container),
	}
}

pub fn flatten(raw: &RawRecord, fields: &[&str]) -> Map<String, Value> {
	let mut flat = Map::new();

	for (key, value) in raw.properties.iter().chain(raw.metadata.iter()) {
		if value.is_null() || !fields.contains(&key.as_str()) {
			continue;
		}

		flat.insert(key.clone(), value.clone());
	}

	if fields.contains(&"id") {
		flat.insert("id".to_string(), Value::String(raw.id.clone()));
	}

	flat
}
