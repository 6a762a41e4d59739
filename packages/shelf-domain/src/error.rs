pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("Unknown parent type {value:?}; expected domain_root or container.")]
	InvalidParentType { value: String },
	#[error("parent_id and parent_type must be both present or both absent.")]
	ParentMismatch,
	#[error("Visual code prefix {prefix:?} must be two uppercase ASCII letters.")]
	InvalidPrefix { prefix: String },
	#[error("Visual code {code:?} is malformed.")]
	MalformedVisualCode { code: String },
	#[error("Visual code {code:?} has checksum {found:?}; expected {expected:?}.")]
	ChecksumMismatch { code: String, expected: char, found: char },
}
