//! Cosine-similarity ranking of embedded candidates against a query vector.

use serde::Serialize;

/// A candidate scored against the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub key: String,
    pub score: f32,
}

/// Rank candidates by cosine similarity to the query embedding, descending.
///
/// The sort is stable, so candidates with equal scores keep the order they
/// were supplied in. `top_k` is always caller-supplied; an empty candidate
/// set yields an empty result.
pub fn rank_by_similarity<'a, I>(query: &[f32], candidates: I, top_k: usize) -> Vec<RankedItem>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut scored: Vec<RankedItem> = candidates
        .into_iter()
        .map(|(key, embedding)| RankedItem {
            key: key.to_string(),
            score: cosine_similarity(query, embedding),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
