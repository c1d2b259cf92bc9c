//! Word-level n-gram sentence generation library.
//!
//! This crate learns word order from tokenized text and generates new
//! sentences from it:
//! - Interned words with begin/end marker pairing
//! - Per-word context tries with conditional probabilities
//! - A backoff generation walk keeping quotes and parentheses balanced
//! - JSON persistence and binary snapshots
//! - A regex-based tokenizer feeding the model

/// Error type shared by the library.
pub mod error;

/// File and path helpers.
pub mod io;

/// Core n-gram model and generation logic.
pub mod model;

/// Tokenizer turning raw text into token streams.
pub mod parser;

mod tracing_setup;

pub use error::ModelError;
pub use model::config::{GeneratorConfig, Segmentation};
pub use model::dictionary::Dictionary;
pub use model::word::{Role, WordId};
pub use tracing_setup::init_tracing;
