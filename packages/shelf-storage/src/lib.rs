pub mod engine;
pub mod fusion;
pub mod qdrant;

mod error;

pub use engine::{
	BoxFuture, Collection, FieldWeight, FilteredQuery, HybridQuery, NearImageQuery, RawRecord,
	SearchEngine, SortOrder,
};
pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
