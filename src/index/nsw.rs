//! Navigable Small World index: a bidirectional proximity graph searched by
//! greedy walk with a bounded candidate heap.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::errors::Result;
use crate::index::{IndexItem, VectorIndex};
use crate::vector;

const DEFAULT_M: usize = 8;
const DEFAULT_EF_CONSTRUCTION: usize = 32;
const DEFAULT_EF_SEARCH_FLOOR: usize = 32;

#[derive(Debug, Clone)]
pub struct NswParams {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: Option<usize>,
}

impl Default for NswParams {
    fn default() -> Self {
        Self {
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: None,
        }
    }
}

/// Total order wrapper over `f32` distances. The graph never produces NaN
/// distances (cosine distance on finite vectors is always in `[0, 2]`), so
/// treating `partial_cmp` failures as `Equal` is safe in practice.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Dist(f32);

impl Eq for Dist {}
impl PartialOrd for Dist {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Dist {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}

#[derive(Debug, Clone)]
struct Node {
    vector: Vec<f32>,
    neighbors: Vec<String>,
}

#[derive(Debug)]
pub struct NswIndex {
    params: NswParams,
    nodes: HashMap<String, Node>,
    entry_point: Option<String>,
}

impl NswIndex {
    pub fn new(params: NswParams) -> Self {
        Self {
            params,
            nodes: HashMap::new(),
            entry_point: None,
        }
    }

    fn m_max(&self) -> usize {
        2 * self.params.m
    }

    fn dist(&self, q: &[f32], id: &str) -> f32 {
        vector::cosine_distance(q, &self.nodes[id].vector)
    }

    /// Greedy walk from `entry`, maintaining a bounded `ef`-sized result set.
    /// Returns ascending-by-distance `(id, distance)` pairs.
    fn greedy(&self, q: &[f32], entry: &str, ef: usize) -> Vec<(String, f32)> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(entry.to_string());

        let entry_dist = self.dist(q, entry);
        let mut candidates: BinaryHeap<Reverse<(Dist, String)>> = BinaryHeap::new();
        candidates.push(Reverse((Dist(entry_dist), entry.to_string())));

        let mut results: BinaryHeap<(Dist, String)> = BinaryHeap::new();
        results.push((Dist(entry_dist), entry.to_string()));

        while let Some(Reverse((Dist(cdist), cid))) = candidates.pop() {
            if let Some((Dist(worst), _)) = results.peek() {
                if cdist > *worst && results.len() >= ef {
                    break;
                }
            }
            let neighbors = match self.nodes.get(&cid) {
                Some(n) => n.neighbors.clone(),
                None => continue,
            };
            for nid in neighbors {
                if visited.insert(nid.clone()) {
                    let nd = self.dist(q, &nid);
                    candidates.push(Reverse((Dist(nd), nid.clone())));
                    results.push((Dist(nd), nid));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<(String, f32)> =
            results.into_iter().map(|(Dist(d), id)| (id, d)).collect();
        out.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    fn ef_search(&self, k: usize) -> usize {
        self.params.ef_search.unwrap_or(DEFAULT_EF_SEARCH_FLOOR).max(k)
    }

    /// Prunes `id`'s neighbor list down to the `M` closest when it has grown
    /// past `M_max`, bounding per-node memory without losing connectivity.
    fn prune_if_needed(&mut self, id: &str) {
        let m = self.params.m;
        let m_max = self.m_max();
        let needs_prune = self.nodes.get(id).map(|n| n.neighbors.len() > m_max).unwrap_or(false);
        if !needs_prune {
            return;
        }
        let anchor = self.nodes[id].vector.clone();
        let mut scored: Vec<(f32, String)> = self.nodes[id]
            .neighbors
            .iter()
            .map(|nid| (vector::cosine_distance(&anchor, &self.nodes[nid].vector), nid.clone()))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(m);
        self.nodes.get_mut(id).unwrap().neighbors = scored.into_iter().map(|(_, id)| id).collect();
    }

    fn add_back_edge(&mut self, from: &str, to: &str) {
        if let Some(n) = self.nodes.get_mut(from) {
            if !n.neighbors.iter().any(|x| x == to) {
                n.neighbors.push(to.to_string());
            }
        }
    }

    fn promote_new_entry_point(&mut self) {
        self.entry_point = self
            .nodes
            .iter()
            .map(|(id, n)| (id.clone(), n.neighbors.len()))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(id, _)| id);
    }
}

impl VectorIndex for NswIndex {
    fn rebuild(&mut self, items: &[IndexItem]) -> Result<()> {
        self.nodes.clear();
        self.entry_point = None;
        for (id, v) in items {
            self.add(id, v)?;
        }
        Ok(())
    }

    fn add(&mut self, id: &str, v: &[f32]) -> Result<()> {
        self.nodes.insert(
            id.to_string(),
            Node {
                vector: v.to_vec(),
                neighbors: Vec::new(),
            },
        );

        let entry = match &self.entry_point {
            None => {
                self.entry_point = Some(id.to_string());
                return Ok(());
            }
            Some(e) if e == id => return Ok(()),
            Some(e) => e.clone(),
        };

        let candidates = self.greedy(v, &entry, self.params.ef_construction);
        let chosen: Vec<String> = candidates
            .into_iter()
            .filter(|(cid, _)| cid != id)
            .take(self.params.m)
            .map(|(cid, _)| cid)
            .collect();

        for neighbor in &chosen {
            self.add_back_edge(id, neighbor);
            self.add_back_edge(neighbor, id);
            self.prune_if_needed(neighbor);
        }
        self.prune_if_needed(id);

        Ok(())
    }

    fn remove(&mut self, id: &str) {
        if self.nodes.remove(id).is_none() {
            return;
        }
        for node in self.nodes.values_mut() {
            node.neighbors.retain(|n| n != id);
        }
        if self.entry_point.as_deref() == Some(id) {
            self.promote_new_entry_point();
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let entry = match &self.entry_point {
            Some(e) => e.clone(),
            None => return Vec::new(),
        };
        if k == 0 {
            return Vec::new();
        }
        let ef = self.ef_search(k);
        let hits = self.greedy(query, &entry, ef);
        hits.into_iter()
            .take(k)
            .map(|(id, d)| (id, 1.0 - d))
            .collect()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}
