use cdl_domain::similarity::{self, NEUTRAL_SCORE};
use cdl_storage::models::Document;

pub trait SimilarityRanker
where
	Self: Send + Sync,
{
	/// Score in `[0, 1]` of a stored embedding against the query embedding.
	fn score(&self, query: &[f32], document: Option<&[f32]>) -> f32;
}

/// Cosine similarity mapped onto `[0, 1]`, neutral when it cannot be computed.
pub struct CosineRanker;
impl SimilarityRanker for CosineRanker {
	fn score(&self, query: &[f32], document: Option<&[f32]>) -> f32 {
		similarity::score(query, document)
	}
}

/// Scores every candidate, sorts by descending score and keeps the first `limit`.
///
/// The sort is stable, so equal scores keep the candidates' incoming order. Without a query
/// embedding every candidate gets the neutral score.
pub fn rank(
	ranker: &dyn SimilarityRanker,
	query: Option<&[f32]>,
	candidates: Vec<Document>,
	limit: usize,
) -> Vec<(Document, f32)> {
	let mut scored = candidates
		.into_iter()
		.map(|doc| {
			let score = match query {
				Some(query) => ranker.score(query, doc.content_embedding.as_deref()),
				None => NEUTRAL_SCORE,
			};

			(doc, score)
		})
		.collect::<Vec<_>>();

	scored.sort_by(|(_, a), (_, b)| similarity::cmp_score_desc(*a, *b));
	scored.truncate(limit);

	scored
}
