use crate::model::word::WordId;

/// Errors reported by model construction, configuration and persistence.
///
/// Generation never produces one of these: a dead end is signalled by an
/// empty result instead.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("malformed model document: {0}")]
	Json(#[from] serde_json::Error),

	#[error("malformed model snapshot: {0}")]
	Snapshot(#[from] postcard::Error),

	#[error("order must be >= 1, got {0}")]
	InvalidOrder(usize),

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("duplicate word id {0}")]
	DuplicateWordId(WordId),

	#[error("duplicate word input text {0:?}")]
	DuplicateInput(String),

	#[error("word id {0} leaves no room for new words")]
	IdSpaceExhausted(WordId),

	#[error("gram of word {owner} lists word {word} twice among siblings")]
	DuplicateGram { owner: WordId, word: WordId },

	#[error("gram references unknown word id {0}")]
	UnknownWordId(WordId),

	#[error("root gram of word {owner} references word {found}")]
	RootMismatch { owner: WordId, found: WordId },

	#[error("gram tree of word {owner} is deeper than order {n} allows")]
	TrieTooDeep { owner: WordId, n: usize },
}
