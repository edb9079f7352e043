//! Random-walk sampling estimator (wander join).
//!
//! Each walk binds the query's edges one at a time: the first edge is
//! drawn uniformly from the data edges carrying its label, every later
//! edge is drawn uniformly among the adjacency candidates of an
//! already-bound endpoint, and the inverse of each draw probability is
//! folded into the walk's weight. Pattern-closing edges (both endpoints
//! already bound) degrade to ordered membership tests. The mean walk
//! weight is an unbiased estimate of the match count for any connected
//! pattern.

use crate::Estimator;
use cardest_common::{ELabel, Error, Result, VertexId};
use cardest_graph::{DataGraph, QueryEdge, QueryGraph, summary};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Registry name of this estimator.
pub const METHOD: &str = "wj";

/// Per-elabel edge index, thinned by the sampling ratio at build time.
#[derive(Debug, Serialize, Deserialize)]
struct LabelEdges {
    label: u32,
    /// True number of edges with this label in the full graph; the
    /// first-edge weight, regardless of how many were kept.
    total: u64,
    /// Kept `(src, dst)` pairs, in compacted-graph order.
    edges: Vec<(u32, u32)>,
}

/// The persisted wander-join statistic.
#[derive(Debug, Serialize, Deserialize)]
struct WjSummary {
    vertex_count: u32,
    edge_count: u64,
    /// Sorted by label for deterministic bytes.
    by_label: Vec<LabelEdges>,
}

impl WjSummary {
    fn label_entry(&self, label: ELabel) -> Option<&LabelEdges> {
        self.by_label
            .binary_search_by_key(&label.0, |e| e.label)
            .ok()
            .map(|i| &self.by_label[i])
    }
}

/// Wander-join estimator.
#[derive(Debug, Default)]
pub struct WanderJoin {
    summary: Option<WjSummary>,
}

impl Estimator for WanderJoin {
    fn method(&self) -> &'static str {
        METHOD
    }

    fn summarize(
        &mut self,
        graph: &DataGraph,
        out_path: &Path,
        param: f64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let ratio = param.clamp(0.0, 1.0);
        let mut by_label = Vec::new();
        for label in graph.distinct_elabels() {
            let all = graph.edges_with_label(label);
            let edges: Vec<(u32, u32)> = all
                .iter()
                .filter(|_| ratio >= 1.0 || rng.random::<f64>() < ratio)
                .map(|&(s, d)| (s.0, d.0))
                .collect();
            by_label.push(LabelEdges {
                label: label.0,
                total: all.len() as u64,
                edges,
            });
        }
        let summary = WjSummary {
            vertex_count: graph.vertex_count(),
            edge_count: graph.edge_count(),
            by_label,
        };
        tracing::debug!(labels = summary.by_label.len(), "built wander-join summary");
        summary::write_summary(out_path, METHOD, &summary)
    }

    fn read_summary(&mut self, path: &Path) -> Result<()> {
        self.summary = Some(summary::read_summary(path, METHOD)?);
        Ok(())
    }

    fn run(
        &self,
        graph: &DataGraph,
        query: &QueryGraph,
        param: f64,
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        let summary = self
            .summary
            .as_ref()
            .ok_or(Error::SummaryNotLoaded(METHOD))?;
        if query.edge_count() == 0 {
            return Err(Error::UnsupportedQueryShape(
                "pattern has no edges".to_string(),
            ));
        }
        if !query.is_connected() {
            return Err(Error::UnsupportedQueryShape(
                "disconnected pattern".to_string(),
            ));
        }

        let order = walk_order(query);
        let num_walks = ((param * summary.edge_count as f64).ceil() as u64).max(1);

        let mut total = 0.0;
        for _ in 0..num_walks {
            total += self.one_walk(graph, query, summary, &order, rng);
        }
        Ok(total / num_walks as f64)
    }
}

impl WanderJoin {
    /// One walk: returns its inverse-probability weight, 0.0 if the
    /// walk dead-ends or violates a constraint.
    fn one_walk(
        &self,
        graph: &DataGraph,
        query: &QueryGraph,
        summary: &WjSummary,
        order: &[usize],
        rng: &mut dyn RngCore,
    ) -> f64 {
        let edges = query.edges();
        let mut bound: Vec<Option<VertexId>> = vec![None; query.vertex_count() as usize];
        let mut weight = 1.0;

        for (step, &ei) in order.iter().enumerate() {
            let e = edges[ei];
            let (src_bound, dst_bound) = (bound[e.src as usize], bound[e.dst as usize]);

            match (src_bound, dst_bound) {
                (None, None) => {
                    debug_assert_eq!(step, 0, "later edges always touch a bound vertex");
                    let Some((src, dst, count)) = first_edge(summary, e.label, rng) else {
                        return 0.0;
                    };
                    if !endpoint_ok(graph, query, &bound, e.src, src)
                        || !endpoint_ok(graph, query, &bound, e.dst, dst)
                        || (e.src != e.dst && src == dst)
                    {
                        return 0.0;
                    }
                    bound[e.src as usize] = Some(src);
                    bound[e.dst as usize] = Some(dst);
                    weight *= count as f64;
                }
                (Some(src), Some(dst)) => {
                    // Closing edge: plain membership test.
                    if !graph.has_edge(src, dst, e.label) {
                        return 0.0;
                    }
                }
                (Some(src), None) => {
                    let candidates: Vec<VertexId> = graph
                        .out_edges(src)
                        .filter(|&(_, l)| e.label.matches(l))
                        .map(|(n, _)| n)
                        .collect();
                    let Some(dst) = pick(&candidates, rng) else {
                        return 0.0;
                    };
                    if !endpoint_ok(graph, query, &bound, e.dst, dst) {
                        return 0.0;
                    }
                    bound[e.dst as usize] = Some(dst);
                    weight *= candidates.len() as f64;
                }
                (None, Some(dst)) => {
                    let candidates: Vec<VertexId> = graph
                        .in_edges(dst)
                        .filter(|&(_, l)| e.label.matches(l))
                        .map(|(n, _)| n)
                        .collect();
                    let Some(src) = pick(&candidates, rng) else {
                        return 0.0;
                    };
                    if !endpoint_ok(graph, query, &bound, e.src, src) {
                        return 0.0;
                    }
                    bound[e.src as usize] = Some(src);
                    weight *= candidates.len() as f64;
                }
            }
        }
        weight
    }
}

/// Orders query edges so every edge after the first touches an
/// already-bound pattern vertex. Connected patterns always admit such
/// an order.
fn walk_order(query: &QueryGraph) -> Vec<usize> {
    let edges = query.edges();
    let mut order = Vec::with_capacity(edges.len());
    let mut used = vec![false; edges.len()];
    let mut touched = vec![false; query.vertex_count() as usize];

    seed_edge(&mut order, &mut used, &mut touched, edges, 0);
    while order.len() < edges.len() {
        let next = (0..edges.len()).find(|&i| {
            !used[i] && (touched[edges[i].src as usize] || touched[edges[i].dst as usize])
        });
        match next {
            Some(i) => seed_edge(&mut order, &mut used, &mut touched, edges, i),
            // Unreachable for connected patterns; checked by the caller.
            None => break,
        }
    }
    order
}

fn seed_edge(
    order: &mut Vec<usize>,
    used: &mut [bool],
    touched: &mut [bool],
    edges: &[QueryEdge],
    i: usize,
) {
    order.push(i);
    used[i] = true;
    touched[edges[i].src as usize] = true;
    touched[edges[i].dst as usize] = true;
}

/// A new binding must satisfy the pattern vertex's labels and stay
/// injective with respect to earlier bindings.
fn endpoint_ok(
    graph: &DataGraph,
    query: &QueryGraph,
    bound: &[Option<VertexId>],
    qv: u32,
    dv: VertexId,
) -> bool {
    query
        .vertex_labels(qv)
        .iter()
        .all(|&l| graph.vertex_has_label(dv, l))
        && !bound.iter().any(|b| *b == Some(dv))
}

/// Draws the first edge uniformly from the summary's index for
/// `label`; wildcard labels draw from the union of all labels. Returns
/// the edge and the count it stands in for.
fn first_edge(
    summary: &WjSummary,
    label: ELabel,
    rng: &mut dyn RngCore,
) -> Option<(VertexId, VertexId, u64)> {
    if label.is_any() {
        let kept: usize = summary.by_label.iter().map(|e| e.edges.len()).sum();
        if kept == 0 {
            return None;
        }
        let mut idx = rng.random_range(0..kept);
        for entry in &summary.by_label {
            if idx < entry.edges.len() {
                let (s, d) = entry.edges[idx];
                let total: u64 = summary.by_label.iter().map(|e| e.total).sum();
                return Some((VertexId::new(s), VertexId::new(d), total));
            }
            idx -= entry.edges.len();
        }
        None
    } else {
        let entry = summary.label_entry(label)?;
        if entry.edges.is_empty() {
            return None;
        }
        let (s, d) = entry.edges[rng.random_range(0..entry.edges.len())];
        Some((VertexId::new(s), VertexId::new(d), entry.total))
    }
}

fn pick(candidates: &[VertexId], rng: &mut dyn RngCore) -> Option<VertexId> {
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.random_range(0..candidates.len())])
    }
}
