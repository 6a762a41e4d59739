pub mod asset;
pub mod visual_code;

mod error;

pub use asset::{
	Asset, AssetHeader, AssetKind, Container, DeclaredFields, File, Item, ParentType,
};
pub use error::{Error, Result};
pub use visual_code::VisualCode;
