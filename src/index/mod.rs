//! The pluggable index abstraction and its three concrete strategies.
//!
//! An index is opaque to the `Collection` beyond the four operations of
//! [`VectorIndex`]; the strategy-pattern seam is a trait object
//! (`Box<dyn VectorIndex>`), not an inheritance hierarchy.

pub mod exact;
pub mod ivf;
pub mod nsw;

use crate::errors::Result;

/// One item handed to `rebuild`/`add`: an id paired with its embedding.
pub type IndexItem = (String, Vec<f32>);

/// Capability contract shared by every concrete index strategy.
///
/// Implementations own their vectors by value, never a reference into a
/// record-store file, and must keep `search` results ordered by
/// descending score with ties broken by ascending id.
pub trait VectorIndex: Send + Sync {
    /// Replaces all internal state with the given items.
    fn rebuild(&mut self, items: &[IndexItem]) -> Result<()>;

    /// Incorporates one item, preserving the index's invariants.
    fn add(&mut self, id: &str, vector: &[f32]) -> Result<()>;

    /// Drops the item with the given id. A no-op if absent.
    fn remove(&mut self, id: &str);

    /// Returns up to `k` `(id, score)` pairs ordered by descending score.
    fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)>;

    /// Number of items currently held by the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Breaks score ties deterministically: higher score first, then ascending
/// id. Shared by every index's final sort step.
pub(crate) fn sort_hits(hits: &mut Vec<(String, f32)>) {
    hits.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}
