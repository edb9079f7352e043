//! Binary codec for the compacted data graph.
//!
//! The layout is private to this workbench and does not need to be
//! portable across versions; it only needs to round-trip exactly and
//! load with a single linear scan. Everything is little-endian:
//!
//! ```text
//! magic "CARD" | version u32 | vertex_count u32 | edge_count u64
//! | vlabel offsets | vlabel data
//! | out offsets | out neighbors | out labels
//! | in offsets  | in neighbors  | in labels
//! | crc32 over everything after the magic
//! ```
//!
//! Each array is a u64 length followed by its elements. The per-elabel
//! edge index is derived state and is rebuilt after load rather than
//! persisted.

use crate::data_graph::DataGraph;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use cardest_common::{ELabel, Error, Result, VLabel, VertexId};
use std::fs;
use std::io::Cursor;
use std::path::Path;

const MAGIC: &[u8; 4] = b"CARD";
const VERSION: u32 = 1;

impl DataGraph {
    /// Pure existence check used by the caller to skip rebuilding.
    #[must_use]
    pub fn has_binary(path: impl AsRef<Path>) -> bool {
        path.as_ref().exists()
    }

    /// Persists the compacted layout.
    pub fn write_binary(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.is_compacted() {
            return Err(Error::GraphCorrupt(
                "write_binary called before make_binary".into(),
            ));
        }

        let mut payload = Vec::new();
        payload.write_u32::<LittleEndian>(VERSION)?;
        payload.write_u32::<LittleEndian>(self.vertex_count())?;
        payload.write_u64::<LittleEndian>(self.edge_count())?;

        write_u64s(&mut payload, &self.vlabel_offsets)?;
        write_u32s(&mut payload, self.vlabels.iter().map(|l| l.0))?;
        write_u64s(&mut payload, &self.out_offsets)?;
        write_u32s(&mut payload, self.out_nbrs.iter().map(|v| v.0))?;
        write_u32s(&mut payload, self.out_labs.iter().map(|l| l.0))?;
        write_u64s(&mut payload, &self.in_offsets)?;
        write_u32s(&mut payload, self.in_nbrs.iter().map(|v| v.0))?;
        write_u32s(&mut payload, self.in_labs.iter().map(|l| l.0))?;

        let checksum = crc32fast::hash(&payload);
        let mut out = Vec::with_capacity(MAGIC.len() + payload.len() + 4);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&payload);
        out.extend_from_slice(&checksum.to_le_bytes());
        fs::write(path, out)?;
        Ok(())
    }

    /// Restores a compacted graph byte-for-bit.
    pub fn read_binary(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        if bytes.len() < MAGIC.len() + 4 || &bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::GraphCorrupt(format!(
                "{} is not a binary graph file",
                path.as_ref().display()
            )));
        }
        let payload = &bytes[MAGIC.len()..bytes.len() - 4];
        let stored = u32::from_le_bytes(bytes[bytes.len() - 4..].try_into().unwrap_or_default());
        if crc32fast::hash(payload) != stored {
            return Err(Error::GraphCorrupt("checksum mismatch".into()));
        }

        let mut cur = Cursor::new(payload);
        let version = cur.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(Error::GraphCorrupt(format!(
                "unsupported format version {version}"
            )));
        }
        let vertex_count = cur.read_u32::<LittleEndian>()?;
        let edge_count = cur.read_u64::<LittleEndian>()?;

        let vlabel_offsets = read_u64s(&mut cur)?;
        let vlabels = read_u32s(&mut cur)?.into_iter().map(VLabel::new).collect();
        let out_offsets = read_u64s(&mut cur)?;
        let out_nbrs: Vec<VertexId> =
            read_u32s(&mut cur)?.into_iter().map(VertexId::new).collect();
        let out_labs = read_u32s(&mut cur)?.into_iter().map(ELabel::new).collect();
        let in_offsets = read_u64s(&mut cur)?;
        let in_nbrs: Vec<VertexId> =
            read_u32s(&mut cur)?.into_iter().map(VertexId::new).collect();
        let in_labs = read_u32s(&mut cur)?.into_iter().map(ELabel::new).collect();

        if out_nbrs.len() as u64 != edge_count || in_nbrs.len() as u64 != edge_count {
            return Err(Error::GraphCorrupt(
                "adjacency length disagrees with edge count".into(),
            ));
        }

        Ok(DataGraph::from_parts(
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
        ))
    }
}

fn write_u64s(buf: &mut Vec<u8>, values: &[u64]) -> Result<()> {
    buf.write_u64::<LittleEndian>(values.len() as u64)?;
    for &v in values {
        buf.write_u64::<LittleEndian>(v)?;
    }
    Ok(())
}

fn write_u32s(buf: &mut Vec<u8>, values: impl ExactSizeIterator<Item = u32>) -> Result<()> {
    buf.write_u64::<LittleEndian>(values.len() as u64)?;
    for v in values {
        buf.write_u32::<LittleEndian>(v)?;
    }
    Ok(())
}

fn read_u64s(cur: &mut Cursor<&[u8]>) -> Result<Vec<u64>> {
    let len = cur.read_u64::<LittleEndian>()? as usize;
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(cur.read_u64::<LittleEndian>()?);
    }
    Ok(values)
}

fn read_u32s(cur: &mut Cursor<&[u8]>) -> Result<Vec<u32>> {
    let len = cur.read_u64::<LittleEndian>()? as usize;
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(cur.read_u32::<LittleEndian>()?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn graph_from(text: &str) -> DataGraph {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        let mut g = DataGraph::read_text(f.path()).unwrap();
        g.make_binary().unwrap();
        g.clear_raw_data();
        g
    }

    fn assert_same_shape(a: &DataGraph, b: &DataGraph) {
        assert_eq!(a.vertex_count(), b.vertex_count());
        assert_eq!(a.edge_count(), b.edge_count());
        for v in a.vertices() {
            assert_eq!(a.vertex_labels(v), b.vertex_labels(v));
            let ea: Vec<_> = a.out_edges(v).collect();
            let eb: Vec<_> = b.out_edges(v).collect();
            assert_eq!(ea, eb);
            let ia: Vec<_> = a.in_edges(v).collect();
            let ib: Vec<_> = b.in_edges(v).collect();
            assert_eq!(ia, ib);
        }
    }

    #[test]
    fn test_round_trip() {
        let g = graph_from("v 0 0\nv 1 1\nv 2 1\ne 0 1 0\ne 0 2 0\ne 1 2 1\ne 2 0 1\n");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.bin");

        assert!(!DataGraph::has_binary(&path));
        g.write_binary(&path).unwrap();
        assert!(DataGraph::has_binary(&path));

        let loaded = DataGraph::read_binary(&path).unwrap();
        assert_same_shape(&g, &loaded);
        // Derived index must come back too.
        assert_eq!(
            g.edges_with_label(cardest_common::ELabel::new(1)),
            loaded.edges_with_label(cardest_common::ELabel::new(1))
        );
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let g = graph_from("v 0 0\ne 0 0 0\n");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.bin");
        g.write_binary(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 9);
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            DataGraph::read_binary(&path),
            Err(Error::GraphCorrupt(_))
        ));
    }

    #[test]
    fn test_wrong_magic_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.bin");
        std::fs::write(&path, b"not a graph at all").unwrap();
        assert!(matches!(
            DataGraph::read_binary(&path),
            Err(Error::GraphCorrupt(_))
        ));
    }

    proptest::proptest! {
        /// Parse -> compact -> write -> read preserves counts and
        /// sorted adjacency for arbitrary small graphs.
        #[test]
        fn prop_round_trip(edges in proptest::collection::vec((0u32..12, 0u32..12, 0u32..4), 0..40)) {
            let mut text = String::new();
            for v in 0..12 {
                text.push_str(&format!("v {v} {}\n", v % 3));
            }
            for (s, d, l) in &edges {
                text.push_str(&format!("e {s} {d} {l}\n"));
            }
            let g = graph_from(&text);
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("g.bin");
            g.write_binary(&path).unwrap();
            let loaded = DataGraph::read_binary(&path).unwrap();
            assert_same_shape(&g, &loaded);
        }
    }
}
