//! Inverted-File index: k-means centroids with posting lists, probing the
//! nearest `n_probe` clusters at query time.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::errors::Result;
use crate::index::{sort_hits, IndexItem, VectorIndex};
use crate::vector;

const DEFAULT_MAX_ITERATIONS: usize = 25;

#[derive(Debug, Clone)]
pub struct IvfParams {
    /// Number of centroids; `None` derives `max(1, floor(sqrt(n)))` at rebuild time.
    pub k_c: Option<usize>,
    /// Number of clusters probed per query; `None` derives `max(1, ceil(k_c/4))`.
    pub n_probe: Option<usize>,
    pub max_iterations: usize,
    pub seed: u64,
}

impl Default for IvfParams {
    fn default() -> Self {
        Self {
            k_c: None,
            n_probe: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: 0,
        }
    }
}

#[derive(Debug)]
pub struct IvfIndex {
    params: IvfParams,
    centroids: Vec<Vec<f32>>,
    postings: Vec<HashSet<String>>,
    vectors: HashMap<String, Vec<f32>>,
    assignments: HashMap<String, usize>,
}

impl IvfIndex {
    pub fn new(params: IvfParams) -> Self {
        Self {
            params,
            centroids: Vec::new(),
            postings: Vec::new(),
            vectors: HashMap::new(),
            assignments: HashMap::new(),
        }
    }

    fn k_c_for(&self, n: usize) -> usize {
        self.params
            .k_c
            .unwrap_or_else(|| (n as f64).sqrt().floor().max(1.0) as usize)
    }

    fn n_probe_for(&self, k_c: usize) -> usize {
        self.params
            .n_probe
            .unwrap_or_else(|| ((k_c as f64 / 4.0).ceil() as usize).max(1))
            .min(k_c.max(1))
    }

    fn nearest_centroid(&self, v: &[f32]) -> usize {
        self.centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, vector::cosine_distance(v, c)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Runs Lloyd's k-means to convergence (or the iteration cap), assigning
    /// every item to a cluster and recomputing centroids as normalized means.
    fn run_kmeans(&mut self, items: &[IndexItem]) {
        let n = items.len();
        let k_c = self.k_c_for(n).min(n.max(1));
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        let mut centroids: Vec<Vec<f32>> = indices
            .into_iter()
            .take(k_c)
            .map(|i| items[i].1.clone())
            .collect();

        let mut assignments = vec![0usize; n];
        for _iter in 0..self.params.max_iterations {
            let mut changed = false;
            for (idx, (_, v)) in items.iter().enumerate() {
                let nearest = centroids
                    .iter()
                    .enumerate()
                    .map(|(ci, c)| (ci, vector::cosine_distance(v, c)))
                    .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(ci, _)| ci)
                    .unwrap_or(0);
                if assignments[idx] != nearest {
                    assignments[idx] = nearest;
                    changed = true;
                }
            }

            let mut members: Vec<Vec<usize>> = vec![Vec::new(); k_c];
            for (idx, &c) in assignments.iter().enumerate() {
                members[c].push(idx);
            }

            for (c, member_idxs) in members.iter().enumerate() {
                if member_idxs.is_empty() {
                    // Reseed an empty cluster to the point farthest from its
                    // current centroid, so it doesn't sit permanently dead.
                    let farthest = items
                        .iter()
                        .enumerate()
                        .map(|(i, (_, v))| (i, vector::cosine_distance(v, &centroids[c])))
                        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                        .map(|(i, _)| i);
                    if let Some(i) = farthest {
                        centroids[c] = items[i].1.clone();
                        changed = true;
                    }
                } else {
                    let refs: Vec<&[f32]> =
                        member_idxs.iter().map(|&i| items[i].1.as_slice()).collect();
                    let mut m = vector::mean(&refs);
                    vector::normalize(&mut m);
                    centroids[c] = m;
                }
            }

            if !changed {
                break;
            }
        }

        self.centroids = centroids;
        self.postings = vec![HashSet::new(); k_c];
        self.vectors.clear();
        self.assignments.clear();
        for (idx, (id, v)) in items.iter().enumerate() {
            let c = assignments[idx];
            self.postings[c].insert(id.clone());
            self.vectors.insert(id.clone(), v.clone());
            self.assignments.insert(id.clone(), c);
        }
    }
}

impl VectorIndex for IvfIndex {
    fn rebuild(&mut self, items: &[IndexItem]) -> Result<()> {
        if items.is_empty() {
            self.centroids.clear();
            self.postings.clear();
            self.vectors.clear();
            self.assignments.clear();
            return Ok(());
        }
        self.run_kmeans(items);
        Ok(())
    }

    fn add(&mut self, id: &str, v: &[f32]) -> Result<()> {
        if self.centroids.is_empty() {
            // No centroids yet (first insert ever): seed a single cluster
            // around this vector so the index is usable before any rebuild.
            self.centroids.push(v.to_vec());
            self.postings.push(HashSet::new());
        }
        let c = self.nearest_centroid(v);
        self.postings[c].insert(id.to_string());
        self.vectors.insert(id.to_string(), v.to_vec());
        self.assignments.insert(id.to_string(), c);
        Ok(())
    }

    fn remove(&mut self, id: &str) {
        if let Some(c) = self.assignments.remove(id) {
            self.postings[c].remove(id);
        }
        self.vectors.remove(id);
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        if k == 0 || self.centroids.is_empty() {
            return Vec::new();
        }
        let k_c = self.centroids.len();
        let n_probe = self.n_probe_for(k_c);

        let mut centroid_order: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, vector::cosine_similarity(query, c)))
            .collect();
        centroid_order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut candidates = HashSet::new();
        for &(ci, _) in centroid_order.iter().take(n_probe) {
            candidates.extend(self.postings[ci].iter().cloned());
        }

        let mut hits: Vec<(String, f32)> = candidates
            .into_iter()
            .map(|id| {
                let v = &self.vectors[&id];
                let score = vector::cosine_similarity(query, v);
                (id, score)
            })
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
    use std::f32::consts::PI;

    #[test]
    fn rebuild_then_search_recovers_most_of_exact_top_k() {
        let n = 400;
        let items: Vec<IndexItem> = (0..n)
            .map(|i| {
                let theta = 2.0 * PI * (i as f32) / (n as f32);
                (format!("p{i}"), vec![theta.cos(), theta.sin()])
            })
            .collect();

        let mut ivf = IvfIndex::new(IvfParams {
            k_c: Some(4),
            seed: 7,
            ..Default::default()
        });
        ivf.rebuild(&items).unwrap();

        let query = items[0].1.clone();
        let ivf_hits = ivf.search(&query, 10);

        let mut exact = super::super::exact::ExactCosineIndex::new();
        exact.rebuild(&items).unwrap();
        let exact_hits = exact.search(&query, 10);

        let exact_ids: HashSet<&String> = exact_hits.iter().map(|(id, _)| id).collect();
        let overlap = ivf_hits.iter().filter(|(id, _)| exact_ids.contains(id)).count();
        assert!(overlap >= 8, "expected overlap >= 8, got {overlap}");
    }

    #[test]
    fn recall_against_exact_index_on_random_vectors_at_default_params() {
        use rand::Rng;

        let dim = 128;
        let n = 1000;
        let mut rng = StdRng::seed_from_u64(42);
        let items: Vec<IndexItem> = (0..n)
            .map(|i| {
                let v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
                (format!("v{i}"), v)
            })
            .collect();

        let mut ivf = IvfIndex::new(IvfParams::default());
        ivf.rebuild(&items).unwrap();

        let mut exact = super::super::exact::ExactCosineIndex::new();
        exact.rebuild(&items).unwrap();

        let mut total_overlap = 0;
        let queries = 20;
        for q in 0..queries {
            let query = &items[q * (n / queries)].1;
            let ivf_hits = ivf.search(query, 10);
            let exact_hits = exact.search(query, 10);
            let exact_ids: HashSet<&String> = exact_hits.iter().map(|(id, _)| id).collect();
            total_overlap += ivf_hits.iter().filter(|(id, _)| exact_ids.contains(id)).count();
        }
        let recall = total_overlap as f64 / (queries * 10) as f64;
        assert!(recall >= 0.8, "expected recall >= 0.8, got {recall}");
    }

    #[test]
    fn add_and_remove_keep_len_consistent() {
        let mut ivf = IvfIndex::new(IvfParams::default());
        ivf.rebuild(&[("a".into(), vec![1.0, 0.0]), ("b".into(), vec![0.0, 1.0])])
            .unwrap();
        ivf.add("c", &[0.5, 0.5]).unwrap();
        assert_eq!(ivf.len(), 3);
        ivf.remove("a");
        assert_eq!(ivf.len(), 2);
        assert!(ivf.search(&[1.0, 0.0], 10).iter().all(|(id, _)| id != "a"));
    }

    #[test]
    fn empty_rebuild_yields_empty_search() {
        let mut ivf = IvfIndex::new(IvfParams::default());
        ivf.rebuild(&[]).unwrap();
        assert!(ivf.search(&[1.0, 0.0], 5).is_empty());
        assert_eq!(ivf.len(), 0);
    }
}
