//! exam-insight-core: Exam analysis engine, suggestion orchestration, and storage.
//!
//! This crate defines the request/result data model, the per-topic
//! aggregation, the suggestion pipeline (prompt, backend call, reply parser,
//! fallback table), and the append-only analysis store.

pub mod engine;
pub mod error;
pub mod fallback;
pub mod input;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod statistics;
pub mod store;
pub mod traits;
