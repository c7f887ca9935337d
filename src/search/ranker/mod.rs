
use serde::Serialize;

use crate::config::settings::DEFAULT_SNIPPET_LENGTH;
use crate::database::lancedb::RawHit;

/// A ranked, display-ready match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// 1-based position
    pub rank: usize,
    pub id: String,
    pub title: String,
    pub channel: String,
    pub distance: f32,
    /// `1 / (1 + distance)`, in `(0, 1]`
    pub similarity: f32,
    pub snippet: String,
}

/// Map a non-negative distance onto `(0, 1]`, with 0 mapping to exactly 1.
///
/// Works for any distance metric. Slightly negative values from
/// floating-point noise are treated as 0. An undefined (NaN) distance
/// scores 0, the same as an infinitely distant match.
#[inline]
pub fn similarity(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    1.0 / (1.0 + distance.max(0.0))
}

#[derive(Debug, Clone, Copy)]
pub struct SimilarityRanker {
    snippet_length: usize,
}

impl Default for SimilarityRanker {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_SNIPPET_LENGTH)
    }
}

impl SimilarityRanker {
    #[inline]
    pub const fn new(snippet_length: usize) -> Self {
        Self { snippet_length }
    }

    /// Rank hits in the order given. The input is trusted to be sorted by
    /// ascending distance and is not re-sorted.
    #[inline]
    pub fn rank(&self, hits: Vec<RawHit>) -> Vec<SearchResult> {
        hits.into_iter()
            .enumerate()
            .map(|(index, hit)| SearchResult {
                rank: index + 1,
                similarity: similarity(hit.distance),
                snippet: truncate_chars(&hit.body, self.snippet_length),
                id: hit.id,
                title: hit.metadata.title,
                channel: hit.metadata.channel,
                distance: hit.distance,
            })
            .collect()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text.get(..byte_index).unwrap_or(text).to_string(),
        None => text.to_string(),
    }
}
