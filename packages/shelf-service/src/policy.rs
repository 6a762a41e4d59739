//! Score normalization and the swallow-versus-propagate decision for engine failures.

use shelf_storage::{
	Collection, RawRecord,
	engine::{META_DISTANCE, META_SCORE},
};

use crate::{Error, Result};

pub const LIST_ASSETS_POLICY: FailurePolicy = FailurePolicy::Open;
pub const SEARCH_ITEMS_POLICY: FailurePolicy = FailurePolicy::Closed;

/// Relevance as an engine reports it for one hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relevance {
	/// Vector distance; lower is closer.
	Distance(f32),
	/// Engine relevance; higher is better.
	Score(f32),
}
impl Relevance {
	pub fn from_distance(raw: &RawRecord) -> Result<Self> {
		raw.metadata_f32(META_DISTANCE).map(Self::Distance).ok_or_else(|| Error::Mapping {
			id: raw.id.clone(),
			message: "Image hit carries no distance.".to_string(),
		})
	}

	pub fn from_score(raw: &RawRecord) -> Result<Self> {
		raw.metadata_f32(META_SCORE).map(Self::Score).ok_or_else(|| Error::Mapping {
			id: raw.id.clone(),
			message: "Text hit carries no score.".to_string(),
		})
	}

	/// Higher is better, always within `[0, 1]`.
	pub fn normalized_score(self) -> f32 {
		let score = match self {
			Self::Distance(distance) => 1.0 - distance,
			Self::Score(score) => score,
		};

		if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
	/// Engine failures degrade to an empty partial result.
	Open,
	/// Engine failures fail the whole call.
	Closed,
}
impl FailurePolicy {
	/// Only engine failures are ever swallowed. Validation, mapping, and cancellation errors
	/// propagate under both policies.
	pub fn settle<T>(self, collection: Collection, result: Result<T>) -> Result<T>
	where
		T: Default,
	{
		match (self, result) {
			(_, Ok(value)) => Ok(value),
			(Self::Open, Err(err)) if err.is_engine_failure() => {
				tracing::warn!(
					collection = %collection,
					error = %err,
					"Engine sub-query failed; treating it as empty."
				);

				Ok(T::default())
			},
			(_, Err(err)) => Err(err),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn engine_failure() -> Error {
		Error::EngineQuery { collection: Collection::Container, message: "boom".to_string() }
	}

	#[test]
	fn distance_converts_to_similarity() {
		assert!((Relevance::Distance(0.2).normalized_score() - 0.8).abs() < 1e-6);
		assert_eq!(Relevance::Distance(0.0).normalized_score(), 1.0);
	}

	#[test]
	fn scores_are_clamped_into_unit_range() {
		assert_eq!(Relevance::Distance(1.7).normalized_score(), 0.0);
		assert_eq!(Relevance::Score(1.3).normalized_score(), 1.0);
		assert_eq!(Relevance::Score(-0.1).normalized_score(), 0.0);
		assert_eq!(Relevance::Score(f32::NAN).normalized_score(), 0.0);
	}

	#[test]
	fn relevance_requires_metadata() {
		let raw = RawRecord::new("a").with_metadata(META_SCORE, 0.4);

		assert_eq!(Relevance::from_score(&raw).ok(), Some(Relevance::Score(0.4)));
		assert!(matches!(Relevance::from_distance(&raw), Err(Error::Mapping { .. })));
	}

	#[test]
	fn open_policy_swallows_engine_failures_only() {
		let swallowed: Result<Vec<u8>> =
			FailurePolicy::Open.settle(Collection::Container, Err(engine_failure()));

		assert_eq!(swallowed.ok(), Some(Vec::new()));

		let mapping: Result<Vec<u8>> = FailurePolicy::Open.settle(
			Collection::Item,
			Err(Error::Mapping { id: "a".to_string(), message: "bad".to_string() }),
		);

		assert!(matches!(mapping, Err(Error::Mapping { .. })));

		let cancelled: Result<Vec<u8>> =
			FailurePolicy::Open.settle(Collection::Item, Err(Error::Cancelled));

		assert!(matches!(cancelled, Err(Error::Cancelled)));
	}

	#[test]
	fn closed_policy_propagates_engine_failures() {
		let result: Result<Vec<u8>> =
			FailurePolicy::Closed.settle(Collection::Item, Err(engine_failure()));

		assert!(matches!(result, Err(Error::EngineQuery { collection: Collection::Container, .. })));
	}

	#[test]
	fn named_policies() {
		assert_eq!(LIST_ASSETS_POLICY, FailurePolicy::Open);
		assert_eq!(SEARCH_ITEMS_POLICY, FailurePolicy::Closed);
	}
}
