//! Word-level n-gram model.
//!
//! - Words and their marker roles (`Word`)
//! - Per-word context tries (`Gram`)
//! - The registry driving ingestion and queries (`Dictionary`)
//! - Sentence generation with marker balancing (`generator`)
//! - JSON and binary persistence (`persistence`)

/// Settings for ingestion and generation.
pub mod config;

/// Word registry, ingestion, probability recomputation and next-word queries.
pub mod dictionary;

/// Sentence generation walk and text reconstruction.
pub mod generator;

/// Context trie node with weighted, marker-aware sampling.
pub mod gram;

/// Persisted document schema, save/load and corpus loading.
pub mod persistence;

/// Words, ids and marker roles.
pub mod word;
