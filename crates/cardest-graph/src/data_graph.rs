//! Compacted data graph.
//!
//! Lifecycle: [`DataGraph::read_text`] parses the raw edge list,
//! [`DataGraph::make_binary`] compacts it into CSR form with adjacency
//! runs sorted by `(neighbor, edge label)`, and
//! [`DataGraph::clear_raw_data`] drops the raw buffers once the
//! compacted form exists. The compacted form is what the codec
//! persists and what every estimator reads; it is never mutated after
//! compaction.

use crate::text::{self, ParsedGraph};
use cardest_common::{ELabel, Error, FxHashMap, Result, VLabel, VertexId};
use std::path::Path;

/// Raw, pre-compaction storage. Released by `clear_raw_data`.
#[derive(Debug, Default)]
struct RawData {
    parsed: ParsedGraph,
}

/// A labeled, directed data graph with dense vertex ids `[0, n)`.
#[derive(Debug, Default)]
pub struct DataGraph {
    raw: Option<RawData>,

    pub(crate) vertex_count: u32,
    pub(crate) edge_count: u64,

    /// Per-vertex label runs (CSR offsets into `vlabels`).
    pub(crate) vlabel_offsets: Vec<u64>,
    pub(crate) vlabels: Vec<VLabel>,

    /// Outgoing adjacency, sorted by `(neighbor, elabel)` per vertex.
    pub(crate) out_offsets: Vec<u64>,
    pub(crate) out_nbrs: Vec<VertexId>,
    pub(crate) out_labs: Vec<ELabel>,

    /// Incoming adjacency, same ordering invariant.
    pub(crate) in_offsets: Vec<u64>,
    pub(crate) in_nbrs: Vec<VertexId>,
    pub(crate) in_labs: Vec<ELabel>,

    /// Derived at compaction/load time, never persisted:
    /// `elabel -> (src, dst)` pairs for uniform edge sampling.
    pub(crate) edges_by_label: FxHashMap<ELabel, Vec<(VertexId, VertexId)>>,
}

impl DataGraph {
    /// Parses a text edge list into raw (uncompacted) form.
    ///
    /// Data graphs must carry concrete labels; a `-1` wildcard is a
    /// parse error here (it is only meaningful in query graphs).
    pub fn read_text(path: impl AsRef<Path>) -> Result<Self> {
        let parsed = text::parse_file(path)?;
        for v in &parsed.vertices {
            if v.labels.iter().any(|&l| l < 0) {
                return Err(Error::Parse {
                    line: 0,
                    message: format!("data graph vertex {} has a wildcard label", v.id),
                });
            }
        }
        if parsed.edges.iter().any(|e| e.label < 0) {
            return Err(Error::Parse {
                line: 0,
                message: "data graph edge has a wildcard label".to_string(),
            });
        }
        Ok(Self {
            raw: Some(RawData { parsed }),
            ..Self::default()
        })
    }

    /// Compacts the raw form into the CSR layout.
    ///
    /// Deterministic given the parsed input: adjacency runs end up
    /// sorted by `(neighbor, elabel)` regardless of file order.
    pub fn make_binary(&mut self) -> Result<()> {
        let raw = self
            .raw
            .as_ref()
            .ok_or_else(|| Error::GraphCorrupt("make_binary called without raw data".into()))?;
        let parsed = &raw.parsed;

        let n = parsed.max_vertex_id().map_or(0, |m| m as usize + 1);
        self.vertex_count = n as u32;
        self.edge_count = parsed.edges.len() as u64;

        // Vertex label runs, sorted and deduplicated per vertex.
        let mut label_sets: Vec<Vec<VLabel>> = vec![Vec::new(); n];
        for v in &parsed.vertices {
            for &l in &v.labels {
                label_sets[v.id as usize].push(VLabel::new(l as u32));
            }
        }
        self.vlabel_offsets = Vec::with_capacity(n + 1);
        self.vlabels = Vec::new();
        self.vlabel_offsets.push(0);
        for set in &mut label_sets {
            set.sort_unstable();
            set.dedup();
            self.vlabels.extend_from_slice(set);
            self.vlabel_offsets.push(self.vlabels.len() as u64);
        }

        // Degree counting pass, then prefix sums, then fill.
        let mut out_deg = vec![0u64; n];
        let mut in_deg = vec![0u64; n];
        for e in &parsed.edges {
            out_deg[e.src as usize] += 1;
            in_deg[e.dst as usize] += 1;
        }
        self.out_offsets = prefix_sums(&out_deg);
        self.in_offsets = prefix_sums(&in_deg);

        let m = parsed.edges.len();
        self.out_nbrs = vec![VertexId::default(); m];
        self.out_labs = vec![ELabel::default(); m];
        self.in_nbrs = vec![VertexId::default(); m];
        self.in_labs = vec![ELabel::default(); m];
        let mut out_pos: Vec<u64> = self.out_offsets[..n].to_vec();
        let mut in_pos: Vec<u64> = self.in_offsets[..n].to_vec();
        for e in &parsed.edges {
            let lab = ELabel::new(e.label as u32);
            let op = &mut out_pos[e.src as usize];
            self.out_nbrs[*op as usize] = VertexId::new(e.dst);
            self.out_labs[*op as usize] = lab;
            *op += 1;
            let ip = &mut in_pos[e.dst as usize];
            self.in_nbrs[*ip as usize] = VertexId::new(e.src);
            self.in_labs[*ip as usize] = lab;
            *ip += 1;
        }

        sort_runs(&self.out_offsets, &mut self.out_nbrs, &mut self.out_labs);
        sort_runs(&self.in_offsets, &mut self.in_nbrs, &mut self.in_labs);

        self.build_label_index();
        Ok(())
    }

    /// Releases the raw pre-compaction buffers.
    ///
    /// Only legal once the compacted form exists.
    pub fn clear_raw_data(&mut self) {
        debug_assert!(self.is_compacted(), "clear_raw_data before make_binary");
        self.raw = None;
    }

    /// True once the CSR layout has been built (or loaded).
    #[must_use]
    pub fn is_compacted(&self) -> bool {
        !self.out_offsets.is_empty()
    }

    /// Reassembles a compacted graph from its persisted arrays.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        vertex_count: u32,
        edge_count: u64,
        vlabel_offsets: Vec<u64>,
        vlabels: Vec<VLabel>,
        out_offsets: Vec<u64>,
        out_nbrs: Vec<VertexId>,
        out_labs: Vec<ELabel>,
        in_offsets: Vec<u64>,
        in_nbrs: Vec<VertexId>,
        in_labs: Vec<ELabel>,
    ) -> Self {
        let mut g = Self {
            raw: None,
            vertex_count,
            edge_count,
            vlabel_offsets,
            vlabels,
            out_offsets,
            out_nbrs,
            out_labs,
            in_offsets,
            in_nbrs,
            in_labs,
            edges_by_label: FxHashMap::default(),
        };
        g.build_label_index();
        g
    }

    /// Rebuilds the per-elabel edge index from the CSR arrays.
    ///
    /// Runs after compaction and after a binary load; the index is
    /// derived state and is not part of the persisted layout.
    fn build_label_index(&mut self) {
        self.edges_by_label = FxHashMap::default();
        for v in 0..self.vertex_count as usize {
            let (start, end) = (self.out_offsets[v] as usize, self.out_offsets[v + 1] as usize);
            for i in start..end {
                self.edges_by_label
                    .entry(self.out_labs[i])
                    .or_default()
                    .push((VertexId::new(v as u32), self.out_nbrs[i]));
            }
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    /// Labels of a vertex, sorted.
    #[must_use]
    pub fn vertex_labels(&self, v: VertexId) -> &[VLabel] {
        let (s, e) = (
            self.vlabel_offsets[v.index()] as usize,
            self.vlabel_offsets[v.index() + 1] as usize,
        );
        &self.vlabels[s..e]
    }

    /// True if `v` carries (or the query wildcard covers) `label`.
    #[must_use]
    pub fn vertex_has_label(&self, v: VertexId, label: VLabel) -> bool {
        label.is_any() || self.vertex_labels(v).binary_search(&label).is_ok()
    }

    /// Out-degree of a vertex.
    #[must_use]
    pub fn out_degree(&self, v: VertexId) -> usize {
        (self.out_offsets[v.index() + 1] - self.out_offsets[v.index()]) as usize
    }

    /// In-degree of a vertex.
    #[must_use]
    pub fn in_degree(&self, v: VertexId) -> usize {
        (self.in_offsets[v.index() + 1] - self.in_offsets[v.index()]) as usize
    }

    /// Outgoing `(neighbor, elabel)` run of a vertex, sorted by
    /// `(neighbor, elabel)`.
    pub fn out_edges(&self, v: VertexId) -> impl Iterator<Item = (VertexId, ELabel)> + '_ {
        let (s, e) = (
            self.out_offsets[v.index()] as usize,
            self.out_offsets[v.index() + 1] as usize,
        );
        self.out_nbrs[s..e]
            .iter()
            .copied()
            .zip(self.out_labs[s..e].iter().copied())
    }

    /// Incoming `(neighbor, elabel)` run of a vertex.
    pub fn in_edges(&self, v: VertexId) -> impl Iterator<Item = (VertexId, ELabel)> + '_ {
        let (s, e) = (
            self.in_offsets[v.index()] as usize,
            self.in_offsets[v.index() + 1] as usize,
        );
        self.in_nbrs[s..e]
            .iter()
            .copied()
            .zip(self.in_labs[s..e].iter().copied())
    }

    /// Ordered membership test: does the edge `src -[label]-> dst`
    /// exist? O(log degree) via binary search over the sorted run.
    /// A wildcard label matches any label on the edge.
    #[must_use]
    pub fn has_edge(&self, src: VertexId, dst: VertexId, label: ELabel) -> bool {
        let (s, e) = (
            self.out_offsets[src.index()] as usize,
            self.out_offsets[src.index() + 1] as usize,
        );
        let nbrs = &self.out_nbrs[s..e];
        let lo = nbrs.partition_point(|&n| n < dst);
        let hi = nbrs.partition_point(|&n| n <= dst);
        if lo == hi {
            return false;
        }
        if label.is_any() {
            return true;
        }
        self.out_labs[s + lo..s + hi].binary_search(&label).is_ok()
    }

    /// All `(src, dst)` pairs carrying `label`, for uniform sampling.
    #[must_use]
    pub fn edges_with_label(&self, label: ELabel) -> &[(VertexId, VertexId)] {
        self.edges_by_label.get(&label).map_or(&[], Vec::as_slice)
    }

    /// Distinct edge labels present in the graph, sorted.
    #[must_use]
    pub fn distinct_elabels(&self) -> Vec<ELabel> {
        let mut labels: Vec<ELabel> = self.edges_by_label.keys().copied().collect();
        labels.sort_unstable();
        labels
    }

    /// Iterator over all vertex ids.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertex_count).map(VertexId::new)
    }
}

fn prefix_sums(degrees: &[u64]) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(degrees.len() + 1);
    let mut acc = 0u64;
    offsets.push(0);
    for &d in degrees {
        acc += d;
        offsets.push(acc);
    }
    offsets
}

/// Sorts each CSR run by `(neighbor, elabel)` in place.
fn sort_runs(offsets: &[u64], nbrs: &mut [VertexId], labs: &mut [ELabel]) {
    for v in 0..offsets.len().saturating_sub(1) {
        let (s, e) = (offsets[v] as usize, offsets[v + 1] as usize);
        if e - s < 2 {
            continue;
        }
        let mut run: Vec<(VertexId, ELabel)> = nbrs[s..e]
            .iter()
            .copied()
            .zip(labs[s..e].iter().copied())
            .collect();
        run.sort_unstable();
        for (i, (n, l)) in run.into_iter().enumerate() {
            nbrs[s + i] = n;
            labs[s + i] = l;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn diamond_graph() -> DataGraph {
        // 0 -a-> 1, 0 -a-> 2, 1 -b-> 3, 2 -b-> 3, 0 -b-> 3, 3 -a-> 0
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "v 0 0").unwrap();
        writeln!(f, "v 1 1").unwrap();
        writeln!(f, "v 2 1").unwrap();
        writeln!(f, "v 3 2").unwrap();
        writeln!(f, "e 0 1 0").unwrap();
        writeln!(f, "e 0 2 0").unwrap();
        writeln!(f, "e 1 3 1").unwrap();
        writeln!(f, "e 2 3 1").unwrap();
        writeln!(f, "e 0 3 1").unwrap();
        writeln!(f, "e 3 0 0").unwrap();
        let mut g = DataGraph::read_text(f.path()).unwrap();
        g.make_binary().unwrap();
        g.clear_raw_data();
        g
    }

    #[test]
    fn test_compaction_counts() {
        let g = diamond_graph();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.edge_count(), 6);
        assert_eq!(g.out_degree(VertexId::new(0)), 3);
        assert_eq!(g.in_degree(VertexId::new(3)), 3);
    }

    #[test]
    fn test_adjacency_sorted() {
        let g = diamond_graph();
        let run: Vec<_> = g.out_edges(VertexId::new(0)).collect();
        let mut sorted = run.clone();
        sorted.sort_unstable();
        assert_eq!(run, sorted);
    }

    #[test]
    fn test_has_edge() {
        let g = diamond_graph();
        assert!(g.has_edge(VertexId::new(0), VertexId::new(1), ELabel::new(0)));
        assert!(g.has_edge(VertexId::new(0), VertexId::new(3), ELabel::ANY));
        assert!(!g.has_edge(VertexId::new(0), VertexId::new(1), ELabel::new(1)));
        assert!(!g.has_edge(VertexId::new(1), VertexId::new(0), ELabel::new(0)));
    }

    #[test]
    fn test_label_index() {
        let g = diamond_graph();
        assert_eq!(g.edges_with_label(ELabel::new(0)).len(), 3);
        assert_eq!(g.edges_with_label(ELabel::new(1)).len(), 3);
        assert!(g.edges_with_label(ELabel::new(9)).is_empty());
        assert_eq!(
            g.distinct_elabels(),
            vec![ELabel::new(0), ELabel::new(1)]
        );
    }

    #[test]
    fn test_vertex_labels() {
        let g = diamond_graph();
        assert_eq!(g.vertex_labels(VertexId::new(2)), &[VLabel::new(1)]);
        assert!(g.vertex_has_label(VertexId::new(2), VLabel::ANY));
        assert!(!g.vertex_has_label(VertexId::new(2), VLabel::new(0)));
    }

    #[test]
    fn test_rejects_wildcard_in_data_graph() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "v 0 -1").unwrap();
        assert!(DataGraph::read_text(f.path()).is_err());
    }
}
