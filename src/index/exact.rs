//! Exact cosine index: linear scan over all vectors. Ground truth for
//! recall comparisons against the two ANN strategies.

use std::collections::HashMap;

use crate::errors::Result;
use crate::index::{sort_hits, IndexItem, VectorIndex};
use crate::vector;

#[derive(Debug, Default)]
pub struct ExactCosineIndex {
    vectors: HashMap<String, Vec<f32>>,
}

impl ExactCosineIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for ExactCosineIndex {
    fn rebuild(&mut self, items: &[IndexItem]) -> Result<()> {
        self.vectors.clear();
        for (id, v) in items {
            self.vectors.insert(id.clone(), v.clone());
        }
        Ok(())
    }

    fn add(&mut self, id: &str, v: &[f32]) -> Result<()> {
        self.vectors.insert(id.to_string(), v.to_vec());
        Ok(())
    }

    fn remove(&mut self, id: &str) {
        self.vectors.remove(id);
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        if k == 0 {
            return Vec::new();
        }
        // O(n*d) scan; a bounded min-heap would shave the sort to O(n log k)
        // but n is small enough in practice that the straightforward sort
        // keeps this index simple and unambiguously correct as ground truth.
        let mut hits: Vec<(String, f32)> = self
            .vectors
            .iter()
            .map(|(id, v)| (id.clone(), vector::cosine_similarity(query, v)))
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        hits
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx_with(items: &[(&str, Vec<f32>)]) -> ExactCosineIndex {
        let mut idx = ExactCosineIndex::new();
        let items: Vec<IndexItem> = items.iter().map(|(id, v)| (id.to_string(), v.clone())).collect();
        idx.rebuild(&items).unwrap();
        idx
    }

    #[test]
    fn search_returns_closest_vectors_in_descending_order() {
        let idx = idx_with(&[
            ("x", vec![1.0, 0.0, 0.0]),
            ("y", vec![0.0, 1.0, 0.0]),
            ("z", vec![0.0, 0.0, 1.0]),
        ]);
        let hits = idx.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "x");
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn ties_break_by_ascending_id() {
        let idx = idx_with(&[
            ("b", vec![1.0, 0.0]),
            ("a", vec![1.0, 0.0]),
        ]);
        let hits = idx.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].0, "a");
        assert_eq!(hits[1].0, "b");
    }

    #[test]
    fn remove_drops_item_from_results() {
        let mut idx = idx_with(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        idx.remove("a");
        let hits = idx.search(&[1.0, 0.0], 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "b");
    }

    #[test]
    fn k_zero_returns_nothing() {
        let idx = idx_with(&[("a", vec![1.0, 0.0])]);
        assert!(idx.search(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn hundred_points_on_a_line_returns_five_closest_to_midpoint() {
        let items: Vec<(String, Vec<f32>)> = (0..100)
            .map(|i| {
                let t = i as f32 / 100.0;
                (format!("c{i}"), vec![t, 1.0 - t, 0.0])
            })
            .collect();
        let mut idx = ExactCosineIndex::new();
        idx.rebuild(&items).unwrap();
        let hits = idx.search(&[0.5, 0.5, 0.0], 5);
        let ids: Vec<i32> = hits
            .iter()
            .map(|(id, _)| id.trim_start_matches('c').parse::<i32>().unwrap())
            .collect();
        for i in &ids {
            assert!((*i - 50).abs() <= 3, "unexpected id {i} in top-5 near midpoint");
        }
    }
}
