//! Scoring of stored document embeddings against a query embedding.
//!
//! Scores live in `[0, 1]`. Cosine similarity `c` in `[-1, 1]` is mapped with `(c + 1) / 2` and
//! clamped. Whenever a score cannot be computed (no embedding, mismatched dimensions, a zero
//! vector) the neutral score is used instead of dropping the candidate.

use std::cmp::Ordering;

pub const NEUTRAL_SCORE: f32 = 0.5;

pub fn score(query: &[f32], document: Option<&[f32]>) -> f32 {
	let Some(document) = document else {
		return NEUTRAL_SCORE;
	};

	if query.is_empty() || query.len() != document.len() {
		return NEUTRAL_SCORE;
	}

	match cosine(query, document) {
		Some(cos) => unit_interval(cos),
		None => NEUTRAL_SCORE,
	}
}

/// `None` when either vector has zero magnitude or the arithmetic overflows.
pub fn cosine(a: &[f32], b: &[f32]) -> Option<f32> {
	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b.iter()) {
		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return None;
	}

	let cos = dot / (norm_a.sqrt() * norm_b.sqrt());

	cos.is_finite().then_some(cos as f32)
}

pub fn unit_interval(cos: f32) -> f32 {
	((cos + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Scales a vector to unit length in place. Zero and non-finite vectors are left untouched.
pub fn l2_normalize(vec: &mut [f32]) {
	let norm = vec.iter().map(|value| f64::from(*value).powi(2)).sum::<f64>().sqrt();

	if norm == 0.0 || !norm.is_finite() {
		return;
	}

	for value in vec.iter_mut() {
		*value = (f64::from(*value) / norm) as f32;
	}
}

/// Descending comparator that sorts NaN after every real score.
pub fn cmp_score_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
