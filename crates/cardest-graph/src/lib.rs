//! # cardest-graph
//!
//! Graph model and persistence for the cardinality-estimation
//! workbench.
//!
//! A data graph is parsed once from a line-oriented text edge list,
//! compacted into a CSR layout with sorted adjacency runs, and
//! persisted in a private binary format so that query-mode runs can
//! reload it with a single linear scan instead of re-parsing text.
//! Query graphs use the same text format but stay small, are loaded
//! fresh per query, and are never persisted.
//!
//! ## Modules
//!
//! - [`data_graph`] - Compacted data graph and its build pipeline
//! - [`query_graph`] - Small pattern graphs with shape predicates
//! - [`codec`] - Binary read/write for the compacted data graph
//! - [`summary`] - Persisted estimator artifacts and their naming
//! - [`text`] - Shared text edge-list parser

pub mod codec;
pub mod data_graph;
pub mod query_graph;
pub mod summary;
pub mod text;

pub use data_graph::DataGraph;
pub use query_graph::{QueryEdge, QueryGraph};
pub use summary::{SummaryParam, summary_path};
