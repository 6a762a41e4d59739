use crate::Collection;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Collection {collection} does not exist.")]
	SchemaMissing { collection: Collection },
	#[error("Query against {collection} failed: {message}")]
	Query { collection: Collection, message: String },
	#[error("Embedding failed: {message}")]
	Embedding { message: String },
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
