//! Deterministic re-ranking of backend candidates.
//!
//! The backend's distance metric is the only semantic signal; a secondary
//! content-richness signal is applied locally instead of asking the backend
//! for a richer query API. The ordering is load-bearing for compatibility
//! and must not be "fixed": longer documents rank first regardless of
//! distance, and distance breaks ties between equal lengths. Lengths are
//! character counts, unnormalized against distance units.

use std::cmp::Ordering;

/// Re-orders one candidate row and truncates it to `n` entries.
///
/// Inputs are parallel arrays as returned by the backend. An empty
/// candidate set passes through unchanged.
pub fn rerank(
    documents: Vec<String>,
    metadatas: Vec<serde_json::Value>,
    distances: Vec<f32>,
    n: usize,
) -> (Vec<String>, Vec<serde_json::Value>, Vec<f32>) {
    let mut items: Vec<(usize, String, serde_json::Value, f32)> = documents
        .into_iter()
        .zip(metadatas)
        .zip(distances)
        .map(|((document, metadata), distance)| {
            (document.chars().count(), document, metadata, distance)
        })
        .collect();

    items.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| a.3.partial_cmp(&b.3).unwrap_or(Ordering::Equal))
    });
    items.truncate(n);

    let mut documents = Vec::with_capacity(items.len());
    let mut metadatas = Vec::with_capacity(items.len());
    let mut distances = Vec::with_capacity(items.len());
    for (_, document, metadata, distance) in items {
        documents.push(document);
        metadatas.push(metadata);
        distances.push(distance);
    }
    (documents, metadatas, distances)
}
