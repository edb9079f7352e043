//! Small pattern graphs loaded fresh per query.
//!
//! Query graphs reuse the text edge-list format but allow `-1` labels,
//! which become the [`VLabel::ANY`] / [`ELabel::ANY`] wildcards. They
//! are read-only once loaded and never persisted in binary form.

use crate::text;
use cardest_common::{ELabel, Result, VLabel};
use std::path::Path;

/// One directed pattern edge, endpoints in `[0, vertex_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryEdge {
    /// Pattern source vertex.
    pub src: u32,
    /// Pattern destination vertex.
    pub dst: u32,
    /// Required edge label, possibly the wildcard.
    pub label: ELabel,
}

/// A pattern graph to estimate matches for.
#[derive(Debug, Clone, Default)]
pub struct QueryGraph {
    vlabels: Vec<Vec<VLabel>>,
    edges: Vec<QueryEdge>,
}

impl QueryGraph {
    /// Parses a pattern from a text edge list.
    ///
    /// Vertices mentioned only by edges get the wildcard label.
    pub fn read_text(path: impl AsRef<Path>) -> Result<Self> {
        let parsed = text::parse_file(path)?;
        let n = parsed.max_vertex_id().map_or(0, |m| m as usize + 1);

        let mut vlabels = vec![vec![VLabel::ANY]; n];
        for v in &parsed.vertices {
            let labels: Vec<VLabel> = v
                .labels
                .iter()
                .map(|&l| if l < 0 { VLabel::ANY } else { VLabel::new(l as u32) })
                .collect();
            vlabels[v.id as usize] = labels;
        }

        let edges = parsed
            .edges
            .iter()
            .map(|e| QueryEdge {
                src: e.src,
                dst: e.dst,
                label: if e.label < 0 {
                    ELabel::ANY
                } else {
                    ELabel::new(e.label as u32)
                },
            })
            .collect();

        Ok(Self { vlabels, edges })
    }

    /// Number of pattern vertices.
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vlabels.len() as u32
    }

    /// Number of pattern edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Required labels of a pattern vertex (may contain the wildcard).
    #[must_use]
    pub fn vertex_labels(&self, u: u32) -> &[VLabel] {
        &self.vlabels[u as usize]
    }

    /// All pattern edges.
    #[must_use]
    pub fn edges(&self) -> &[QueryEdge] {
        &self.edges
    }

    /// Undirected incidence lists: for each pattern vertex, the
    /// `(edge index, other endpoint)` pairs touching it.
    #[must_use]
    pub fn incidence(&self) -> Vec<Vec<(usize, u32)>> {
        let mut inc = vec![Vec::new(); self.vlabels.len()];
        for (i, e) in self.edges.iter().enumerate() {
            inc[e.src as usize].push((i, e.dst));
            if e.src != e.dst {
                inc[e.dst as usize].push((i, e.src));
            }
        }
        inc
    }

    /// True if the pattern is connected when edges are read as
    /// undirected. The empty pattern counts as connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let n = self.vlabels.len();
        if n == 0 {
            return true;
        }
        let inc = self.incidence();
        let mut seen = vec![false; n];
        let mut stack = vec![0u32];
        seen[0] = true;
        while let Some(u) = stack.pop() {
            for &(_, w) in &inc[u as usize] {
                if !seen[w as usize] {
                    seen[w as usize] = true;
                    stack.push(w);
                }
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// True if the pattern contains an undirected cycle (including
    /// self-loops and parallel edges).
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        let n = self.vlabels.len();
        let mut parent: Vec<u32> = (0..n as u32).collect();
        fn find(parent: &mut [u32], x: u32) -> u32 {
            let mut root = x;
            while parent[root as usize] != root {
                root = parent[root as usize];
            }
            let mut cur = x;
            while parent[cur as usize] != root {
                let next = parent[cur as usize];
                parent[cur as usize] = root;
                cur = next;
            }
            root
        }
        for e in &self.edges {
            if e.src == e.dst {
                return true;
            }
            let (rs, rd) = (find(&mut parent, e.src), find(&mut parent, e.dst));
            if rs == rd {
                return true;
            }
            parent[rs as usize] = rd;
        }
        false
    }

    /// If every edge leaves the same pattern vertex, returns that
    /// vertex: the center of an out-directed star. `None` for empty
    /// patterns and every other shape.
    #[must_use]
    pub fn star_center(&self) -> Option<u32> {
        let first = self.edges.first()?;
        let center = first.src;
        self.edges
            .iter()
            .all(|e| e.src == center && e.dst != center)
            .then_some(center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn query_from(text: &str) -> QueryGraph {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        QueryGraph::read_text(f.path()).unwrap()
    }

    #[test]
    fn test_wildcards() {
        let q = query_from("v 0 -1\nv 1 2\ne 0 1 -1\n");
        assert_eq!(q.vertex_labels(0), &[VLabel::ANY]);
        assert_eq!(q.vertex_labels(1), &[VLabel::new(2)]);
        assert_eq!(q.edges()[0].label, ELabel::ANY);
    }

    #[test]
    fn test_implicit_vertices_get_wildcard() {
        let q = query_from("e 0 2 1\n");
        assert_eq!(q.vertex_count(), 3);
        assert_eq!(q.vertex_labels(1), &[VLabel::ANY]);
    }

    #[test]
    fn test_path_shape() {
        let q = query_from("v 0 0\nv 1 1\nv 2 2\ne 0 1 0\ne 1 2 1\n");
        assert!(q.is_connected());
        assert!(!q.has_cycle());
        assert!(q.star_center().is_none());
    }

    #[test]
    fn test_triangle_has_cycle() {
        let q = query_from("e 0 1 0\ne 1 2 0\ne 2 0 0\n");
        assert!(q.is_connected());
        assert!(q.has_cycle());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let q = query_from("e 0 0 1\n");
        assert!(q.has_cycle());
    }

    #[test]
    fn test_star() {
        let q = query_from("e 0 1 0\ne 0 2 1\ne 0 3 0\n");
        assert_eq!(q.star_center(), Some(0));
        let path = query_from("e 0 1 0\ne 1 2 0\n");
        assert_eq!(path.star_center(), None);
    }

    #[test]
    fn test_disconnected() {
        let q = query_from("e 0 1 0\ne 2 3 0\n");
        assert!(!q.is_connected());
    }
}
