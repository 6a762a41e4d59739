use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result, VisualCode};

/// Keys a raw engine record may contribute to an entity. Anything else is dropped during mapping.
pub trait DeclaredFields {
	const FIELDS: &'static [&'static str];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentType {
	DomainRoot,
	Container,
}
impl ParentType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::DomainRoot => "domain_root",
			Self::Container => "container",
		}
	}
}
impl FromStr for ParentType {
	type Err = Error;

	fn from_str(value: &str) -> Result<Self> {
		match value {
			"domain_root" => Ok(Self::DomainRoot),
			"container" => Ok(Self::Container),
			_ => Err(Error::InvalidParentType { value: value.to_string() }),
		}
	}
}
impl fmt::Display for ParentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
	Item,
	Container,
}
impl AssetKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Item => "item",
			Self::Container => "container",
		}
	}
}

/// Fields shared by items and containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHeader {
	pub id: String,
	pub owner_id: String,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub parent_id: Option<String>,
	#[serde(default)]
	pub parent_type: Option<ParentType>,
	#[serde(default)]
	pub parent_name: Option<String>,
	#[serde(default)]
	pub image_id: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl AssetHeader {
	pub fn check_parent(&self) -> Result<()> {
		if self.parent_id.is_some() != self.parent_type.is_some() {
			return Err(Error::ParentMismatch);
		}

		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
	pub id: String,
	pub name: String,
	pub original_name: String,
	pub file_url: String,
	#[serde(default)]
	pub mime_type: Option<String>,
	#[serde(default)]
	pub size: Option<u64>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
	#[serde(flatten)]
	pub header: AssetHeader,
	pub quantity: u32,
	/// Upload order.
	#[serde(default)]
	pub files: Vec<File>,
}
impl DeclaredFields for Item {
	const FIELDS: &'static [&'static str] = &[
		"id",
		"owner_id",
		"name",
		"description",
		"parent_id",
		"parent_type",
		"parent_name",
		"image_id",
		"created_at",
		"quantity",
		"files",
	];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
	#[serde(flatten)]
	pub header: AssetHeader,
	/// Advisory; not maintained transactionally with child writes.
	#[serde(default)]
	pub child_count: u32,
	#[serde(default)]
	pub path: String,
	#[serde(default)]
	pub visual_code: Option<VisualCode>,
}
impl DeclaredFields for Container {
	const FIELDS: &'static [&'static str] = &[
		"id",
		"owner_id",
		"name",
		"description",
		"parent_id",
		"parent_type",
		"parent_name",
		"image_id",
		"created_at",
		"child_count",
		"path",
		"visual_code",
	];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
	Item(Item),
	Container(Container),
}
impl Asset {
	pub fn header(&self) -> &AssetHeader {
		match self {
			Self::Item(item) => &item.header,
			Self::Container(container) => &container.header,
		}
	}

	pub fn kind(&self) -> AssetKind {
		match self {
			Self::Item(_) => AssetKind::Item,
			Self::Container(_) => AssetKind::Container,
		}
	}

	pub fn id(&self) -> &str {
		&self.header().id
	}

	pub fn created_at(&self) -> OffsetDateTime {
		self.header().created_at
	}
}
impl From<Item> for Asset {
	fn from(item: Item) -> Self {
		Self::Item(item)
	}
}
impl From<Container> for Asset {
	fn from(container: Container) -> Self {
		Self::Container(container)
	}
}
