use shelf_storage::Collection;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Engine query against {collection} failed: {message}")]
	EngineQuery { collection: Collection, message: String },
	#[error("Collection {collection} does not exist.")]
	SchemaMissing { collection: Collection },
	#[error("Failed to map record {id:?}: {message}")]
	Mapping { id: String, message: String },
	#[error("Request was cancelled.")]
	Cancelled,
	#[error("Request deadline exceeded.")]
	DeadlineExceeded,
}
impl Error {
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}

	pub fn from_engine(collection: Collection, err: shelf_storage::Error) -> Self {
		match err {
			shelf_storage::Error::SchemaMissing { collection } => Self::SchemaMissing { collection },
			shelf_storage::Error::Query { collection, message } =>
				Self::EngineQuery { collection, message },
			other => Self::EngineQuery { collection, message: other.to_string() },
		}
	}

	/// Failures of the engine call itself, as opposed to bad input or unmappable records.
	pub fn is_engine_failure(&self) -> bool {
		matches!(self, Self::EngineQuery { .. } | Self::SchemaMissing { .. })
	}
}
