//! Relative-score fusion for hybrid queries.
//!
//! Each ranked list is min-max normalized into `[0, 1]` and contributes `weight * normalized`
//! to a hit's fused score. With weights summing to one the fused score stays in `[0, 1]`.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedHits {
	pub weight: f32,
	/// `(id, raw score)`; higher raw scores are better.
	pub hits: Vec<(String, f32)>,
}

/// Splits the lexical share `1 - alpha` across fields in proportion to their weights.
pub fn list_weights(alpha: f32, field_weights: &[f32]) -> (f32, Vec<f32>) {
	let alpha = alpha.clamp(0.0, 1.0);
	let total: f32 = field_weights.iter().copied().filter(|weight| *weight > 0.0).sum();

	if total <= 0.0 {
		return (1.0, vec![0.0; field_weights.len()]);
	}

	let lexical = field_weights
		.iter()
		.map(|weight| if *weight > 0.0 { (1.0 - alpha) * weight / total } else { 0.0 })
		.collect();

	(alpha, lexical)
}

pub fn relative_score_fusion(lists: &[WeightedHits]) -> Vec<(String, f32)> {
	let mut fused: HashMap<&str, f32> = HashMap::new();

	for list in lists {
		if list.hits.is_empty() || list.weight <= 0.0 {
			continue;
		}

		let (min, max) = list.hits.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |acc, hit| {
			(acc.0.min(hit.1), acc.1.max(hit.1))
		});
		let span = max - min;

		for (id, raw) in &list.hits {
			let normalized = if span > 0.0 { (raw - min) / span } else { 1.0 };
			let entry = fused.entry(id.as_str()).or_insert(0.0);

			*entry += list.weight * normalized;
		}
	}

	let mut out = fused
		.into_iter()
		.map(|(id, score)| (id.to_string(), score.clamp(0.0, 1.0)))
		.collect::<Vec<_>>();

	out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

	out
}
