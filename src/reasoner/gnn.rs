//! Label propagation over the knowledge graph.
//!
//! Category nodes carry one-hot labels. Labels diffuse along the
//! row-normalised weighted adjacency (self loops of weight 1) for a fixed
//! number of steps; each node is then labelled with its strongest category.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::reasoner::graph::{KnowledgeGraph, NodeKind};

/// Diffusion-based node classifier.
#[derive(Debug, Clone)]
pub struct GnnClassifier {
    iterations: usize,
    predictions: HashMap<String, String>,
    trained: bool,
}

impl Default for GnnClassifier {
    fn default() -> Self {
        Self::new(3)
    }
}

impl GnnClassifier {
    /// Create an untrained classifier running `iterations` diffusion steps.
    #[must_use]
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            predictions: HashMap::new(),
            trained: false,
        }
    }

    /// Whether [`train`](Self::train) has produced predictions.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Recompute predictions from the current graph.
    pub fn train(&mut self, graph: &KnowledgeGraph) {
        self.predictions.clear();
        self.trained = false;

        let ids: Vec<(&str, NodeKind)> = graph.nodes().collect();
        if ids.is_empty() {
            warn!("gnn training skipped: empty graph");
            return;
        }
        let index: HashMap<&str, usize> =
            ids.iter().enumerate().map(|(i, (id, _))| (*id, i)).collect();
        let categories: Vec<&str> = ids
            .iter()
            .filter(|(_, kind)| *kind == NodeKind::Category)
            .map(|(id, _)| *id)
            .collect();
        if categories.is_empty() {
            return;
        }

        let n = ids.len();
        let c = categories.len();

        // Dense row-major adjacency; later edges overwrite earlier ones.
        let mut adjacency = vec![0.0f64; n * n];
        for edge in graph.edges() {
            if let (Some(&u), Some(&v)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) {
                adjacency[u * n + v] = f64::from(edge.weight);
            }
        }
        for i in 0..n {
            adjacency[i * n + i] = 1.0;
        }
        for row in adjacency.chunks_mut(n) {
            let sum: f64 = row.iter().sum();
            let sum = if sum == 0.0 { 1.0 } else { sum };
            row.iter_mut().for_each(|w| *w /= sum);
        }

        let mut labels = vec![0.0f64; n * c];
        for (k, category) in categories.iter().enumerate() {
            labels[index[category] * c + k] = 1.0;
        }

        for _ in 0..self.iterations {
            let mut next = vec![0.0f64; n * c];
            for i in 0..n {
                for j in 0..n {
                    let p = adjacency[i * n + j];
                    if p == 0.0 {
                        continue;
                    }
                    for k in 0..c {
                        next[i * c + k] += p * labels[j * c + k];
                    }
                }
            }
            labels = next;
        }

        for (i, (id, _)) in ids.iter().enumerate() {
            let row = &labels[i * c..(i + 1) * c];
            // First maximum wins on ties.
            let (best, score) = row
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(bi, bs), (k, &s)| {
                    if s > bs { (k, s) } else { (bi, bs) }
                });
            if score > 0.0 {
                self.predictions
                    .insert((*id).to_string(), categories[best].to_string());
            }
        }

        self.trained = true;
        info!(nodes = n, classes = c, "gnn trained");
    }

    /// The predicted category of a node. `None` before training.
    #[must_use]
    pub fn predict(&self, node: &str) -> Option<&str> {
        if !self.trained {
            return None;
        }
        self.predictions.get(node).map(String::as_str)
    }
}
