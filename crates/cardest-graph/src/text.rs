//! Shared parser for the line-oriented text edge-list format.
//!
//! The format is owned by upstream tooling:
//!
//! ```text
//! v <vertex-id> <vertex-label> [<vertex-label> ...]
//! e <src-id> <dst-id> <edge-label>
//! ```
//!
//! Blank lines and `#`-comments are skipped. Labels are non-negative
//! integers; query graphs additionally allow `-1` as a wildcard, which
//! the caller decides how to interpret.

use cardest_common::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A parsed vertex record: id plus raw labels (`-1` = wildcard).
#[derive(Debug, Clone)]
pub struct RawVertex {
    /// Vertex id as written in the file.
    pub id: u32,
    /// Raw labels, possibly `-1`.
    pub labels: Vec<i64>,
}

/// A parsed edge record (raw label may be `-1`).
#[derive(Debug, Clone, Copy)]
pub struct RawEdge {
    /// Source vertex id.
    pub src: u32,
    /// Destination vertex id.
    pub dst: u32,
    /// Raw edge label, possibly `-1`.
    pub label: i64,
}

/// A fully parsed text graph, before any validation of label ranges.
#[derive(Debug, Default)]
pub struct ParsedGraph {
    /// Vertex records in file order.
    pub vertices: Vec<RawVertex>,
    /// Edge records in file order.
    pub edges: Vec<RawEdge>,
}

impl ParsedGraph {
    /// Largest vertex id mentioned by any record, or `None` if empty.
    #[must_use]
    pub fn max_vertex_id(&self) -> Option<u32> {
        let from_v = self.vertices.iter().map(|v| v.id).max();
        let from_e = self.edges.iter().map(|e| e.src.max(e.dst)).max();
        from_v.into_iter().chain(from_e).max()
    }
}

/// Parses a text graph file.
///
/// # Errors
///
/// Returns [`Error::Parse`] with the 1-based line number for any
/// malformed record, and [`Error::Io`] if the file cannot be read.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedGraph> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let mut parsed = ParsedGraph::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let tag = fields.next().unwrap_or_default();
        match tag {
            "v" => {
                let id = parse_field::<u32>(fields.next(), lineno, "vertex id")?;
                let labels = fields
                    .map(|f| parse_raw_label(Some(f), lineno))
                    .collect::<Result<Vec<_>>>()?;
                if labels.is_empty() {
                    return Err(malformed(lineno, "vertex record has no labels"));
                }
                parsed.vertices.push(RawVertex { id, labels });
            }
            "e" => {
                let src = parse_field::<u32>(fields.next(), lineno, "source id")?;
                let dst = parse_field::<u32>(fields.next(), lineno, "destination id")?;
                let label = parse_raw_label(fields.next(), lineno)?;
                if fields.next().is_some() {
                    return Err(malformed(lineno, "trailing fields after edge record"));
                }
                parsed.edges.push(RawEdge { src, dst, label });
            }
            other => {
                return Err(malformed(
                    lineno,
                    &format!("unknown record tag '{other}' (expected 'v' or 'e')"),
                ));
            }
        }
    }

    Ok(parsed)
}

fn parse_field<T: std::str::FromStr>(
    field: Option<&str>,
    lineno: usize,
    what: &str,
) -> Result<T> {
    let raw = field.ok_or_else(|| malformed(lineno, &format!("missing {what}")))?;
    raw.parse::<T>()
        .map_err(|_| malformed(lineno, &format!("invalid {what} '{raw}'")))
}

fn parse_raw_label(field: Option<&str>, lineno: usize) -> Result<i64> {
    let value: i64 = parse_field(field, lineno, "label")?;
    if value < -1 {
        return Err(malformed(lineno, &format!("invalid label {value}")));
    }
    Ok(value)
}

fn malformed(line: usize, message: &str) -> Error {
    Error::Parse {
        line,
        message: message.to_string(),
    }
}
