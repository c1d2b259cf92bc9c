use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use tracing::{debug, warn};

use super::config::{GeneratorConfig, Segmentation};
use super::word::{Role, RoleLookup, Word, WordId};
use crate::error::ModelError;
use crate::parser;

pub const BEGIN_SENTENCE: &str = "<s>";
pub const END_SENTENCE: &str = "</s>";
pub const BEGIN_QUOTE: &str = "<q>";
pub const END_QUOTE: &str = "</q>";
pub const BEGIN_PAREN: &str = "<p>";
pub const END_PAREN: &str = "</p>";

/// Structural marker pairs as `((begin input, begin output), (end input, end output))`.
///
/// Registered in this order on a fresh dictionary, which reserves ids 0 to 5.
const MARKER_PAIRS: [((&str, &str), (&str, &str)); 3] = [
	((BEGIN_SENTENCE, ""), (END_SENTENCE, "")),
	((BEGIN_QUOTE, "\""), (END_QUOTE, "\"")),
	((BEGIN_PAREN, "("), (END_PAREN, ")")),
];

/// Tokens that end a sentence during ingestion.
const SENTENCE_ENDINGS: [&str; 3] = [".", "!", "?"];

/// The word registry and the statistics built over it.
///
/// ## Responsibilities:
/// - Assign ids and intern words by their input text
/// - Cut token streams into marker-balanced sentences and index them
/// - Recompute the probabilities of every trie
/// - Answer next-word queries (generation lives in `generator`)
///
/// ## Invariants
/// - Every word is reachable through `index` by its input text
/// - The six structural markers always exist and are paired
/// - `id_counter` is greater than every assigned id
#[derive(Clone, Debug)]
pub struct Dictionary {
	pub(crate) config: GeneratorConfig,
	pub(crate) id_counter: WordId,
	pub(crate) words: BTreeMap<WordId, Word>,
	pub(crate) index: HashMap<String, WordId>,
	pub(crate) begin: WordId,
	pub(crate) end: WordId,
}

impl Default for Dictionary {
	fn default() -> Self {
		Self::new(GeneratorConfig::default())
	}
}

impl RoleLookup for Dictionary {
	fn role_of(&self, id: WordId) -> Role {
		self.words.get(&id).map(Word::role).unwrap_or_default()
	}
}

impl Dictionary {
	/// Creates an empty dictionary holding only the structural markers.
	pub fn new(config: GeneratorConfig) -> Self {
		let mut dictionary = Self::empty(config);
		for ((begin, begin_output), (end, end_output)) in MARKER_PAIRS {
			dictionary.register(begin, begin_output);
			dictionary.register(end, end_output);
		}
		dictionary.pair_markers();
		dictionary
	}

	/// Creates an empty dictionary of order `n` with default settings.
	///
	/// # Errors
	/// Returns an error if `n == 0`.
	pub fn with_order(n: usize) -> Result<Self, ModelError> {
		Ok(Self::new(GeneratorConfig::new(n)?))
	}

	/// A dictionary without any word, not even the markers.
	pub(crate) fn empty(config: GeneratorConfig) -> Self {
		Self {
			config,
			id_counter: 0,
			words: BTreeMap::new(),
			index: HashMap::new(),
			begin: 0,
			end: 0,
		}
	}

	pub fn config(&self) -> &GeneratorConfig {
		&self.config
	}

	pub fn config_mut(&mut self) -> &mut GeneratorConfig {
		&mut self.config
	}

	pub fn n(&self) -> usize {
		self.config.n()
	}

	/// Number of known words, markers included.
	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}

	pub fn word(&self, id: WordId) -> Option<&Word> {
		self.words.get(&id)
	}

	pub fn word_by_text(&self, input: &str) -> Option<&Word> {
		self.index.get(input).and_then(|id| self.words.get(id))
	}

	/// Iterates every word in id order.
	pub fn words(&self) -> impl Iterator<Item = &Word> {
		self.words.values()
	}

	pub fn begin_sentence(&self) -> WordId {
		self.begin
	}

	pub fn end_sentence(&self) -> WordId {
		self.end
	}

	/// Adds a word under the next free id.
	pub(crate) fn register(&mut self, input: &str, output: &str) -> WordId {
		let id = self.id_counter;
		self.id_counter += 1;
		self.words.insert(id, Word::new(id, input, output));
		self.index.insert(input.to_owned(), id);
		id
	}

	/// Returns the id of `input`, registering it first if unseen.
	fn intern(&mut self, input: &str) -> WordId {
		match self.index.get(input) {
			Some(id) => *id,
			None => self.register(input, input),
		}
	}

	/// Pairs the structural markers by their input text, registering any that
	/// is missing.
	pub(crate) fn pair_markers(&mut self) {
		for ((begin, begin_output), (end, end_output)) in MARKER_PAIRS {
			let begin_id = self.marker_id(begin, begin_output);
			let end_id = self.marker_id(end, end_output);
			if let Some(word) = self.words.get_mut(&begin_id) {
				word.pair_as_begin_of(end_id);
			}
			if let Some(word) = self.words.get_mut(&end_id) {
				word.pair_as_end_of(begin_id);
			}
			if begin == BEGIN_SENTENCE {
				self.begin = begin_id;
				self.end = end_id;
			}
		}
	}

	fn marker_id(&mut self, input: &str, output: &str) -> WordId {
		match self.index.get(input) {
			Some(id) => *id,
			None => {
				warn!(marker = input, "structural marker missing, registering it");
				self.register(input, output)
			}
		}
	}

	/// Ids of `seed` words known to the dictionary, sentence markers excluded.
	///
	/// The seed goes through the same tokenizer as ingested text.
	pub(crate) fn resolve_seed(&self, seed: &str) -> Vec<WordId> {
		seed_tokens(seed)
			.into_iter()
			.filter_map(|text| match self.index.get(&text) {
				Some(id) if *id != self.begin && *id != self.end => Some(*id),
				Some(_) => None,
				None => {
					debug!(word = %text, "unknown seed word skipped");
					None
				}
			})
			.collect()
	}

	/// Start positions to try for a sentence of `len` words, longest context first.
	pub(crate) fn window(&self, len: usize) -> Range<usize> {
		len.saturating_sub(self.config.context_len())..len
	}

	/// Ingests an ordered token stream.
	///
	/// The stream is cut into sentences, each wrapped in `<s>`/`</s>`, and
	/// every sentence is indexed from each of its positions. Unseen tokens are
	/// registered on the way.
	///
	/// Returns the number of sentences indexed.
	///
	/// # Notes
	/// - Probabilities are stale until `recompute_probabilities` runs.
	/// - A trailing unterminated sentence is closed and indexed.
	pub fn ingest<S: AsRef<str>>(&mut self, tokens: &[S]) -> usize {
		let mut indexed = 0;
		let mut sentence = vec![self.begin];
		let mut stack: Vec<WordId> = Vec::new();

		for token in tokens {
			let text = token.as_ref().trim();
			if text.is_empty() {
				continue;
			}
			if text == BEGIN_SENTENCE {
				if sentence.len() > 1 {
					indexed += self.close_sentence(&mut sentence, &mut stack);
				}
				continue;
			}
			if text == END_SENTENCE {
				indexed += self.close_sentence(&mut sentence, &mut stack);
				continue;
			}

			let id = self.intern(text);
			match self.role_of(id) {
				Role::Begin { .. } => {
					sentence.push(id);
					stack.push(id);
				}
				Role::End { begin } if stack.contains(&begin) => {
					// Close whatever was opened inside the matching marker first
					while let Some(open) = stack.pop() {
						if open == begin {
							break;
						}
						if let Some(closing) = self.role_of(open).counterpart() {
							sentence.push(closing);
						}
					}
					sentence.push(id);
				}
				Role::End { .. } => {
					debug!(marker = text, "end marker without open counterpart dropped");
				}
				Role::Plain => {
					sentence.push(id);
					let boundary = SENTENCE_ENDINGS.contains(&text)
						&& (stack.is_empty() || self.config.segmentation == Segmentation::Eager);
					if boundary {
						indexed += self.close_sentence(&mut sentence, &mut stack);
					}
				}
			}
		}

		if sentence.len() > 1 {
			indexed += self.close_sentence(&mut sentence, &mut stack);
		}
		indexed
	}

	/// Closes the open markers, terminates the sentence, indexes it and starts
	/// a new one. Returns 1 if something was indexed.
	fn close_sentence(&mut self, sentence: &mut Vec<WordId>, stack: &mut Vec<WordId>) -> usize {
		while let Some(open) = stack.pop() {
			if let Some(closing) = self.role_of(open).counterpart() {
				sentence.push(closing);
			}
		}
		sentence.push(self.end);

		let complete = std::mem::replace(sentence, vec![self.begin]);
		usize::from(self.record_sentence(&complete))
	}

	/// Indexes every suffix of a complete sentence.
	///
	/// Empty sentences (`<s> </s>`) are ignored. A sentence whose markers do
	/// not balance is reported and skipped.
	fn record_sentence(&mut self, sentence: &[WordId]) -> bool {
		if sentence.len() <= 2 {
			return false;
		}
		if !self.is_balanced(sentence) {
			warn!(len = sentence.len(), "unbalanced markers in ingested sentence, skipped");
			return false;
		}

		let n = self.config.n();
		for (position, id) in sentence.iter().enumerate() {
			if let Some(word) = self.words.get_mut(id) {
				word.record_continuation(sentence, position, n);
			}
		}
		true
	}

	/// Checks that markers open and close in LIFO order and all get closed.
	pub(crate) fn is_balanced(&self, sentence: &[WordId]) -> bool {
		let mut stack: Vec<WordId> = Vec::new();
		for id in sentence {
			match self.role_of(*id) {
				Role::Begin { .. } => stack.push(*id),
				Role::End { begin } => {
					if stack.pop() != Some(begin) {
						return false;
					}
				}
				Role::Plain => (),
			}
		}
		stack.is_empty()
	}

	/// Recomputes every probability from the current counts.
	///
	/// Root probabilities are taken against the sum of all root counts; each
	/// level below is normalized over its siblings.
	pub fn recompute_probabilities(&mut self) {
		let total: u64 = self.words.values().map(|word| word.gram().count()).sum();
		for word in self.words.values_mut() {
			word.recompute_probabilities(total);
		}
	}

	/// Seed sentence used by the query helpers: `<s>` followed by the known
	/// seed words.
	fn seed_sentence(&self, seed: &str) -> Vec<WordId> {
		let mut sentence = vec![self.begin];
		sentence.extend(self.resolve_seed(seed));
		sentence
	}

	/// Most probable plain word following `seed`, using the longest context
	/// that matches.
	pub fn next_most_probable_word(&self, seed: &str) -> Option<String> {
		let sentence = self.seed_sentence(seed);
		self.window(sentence.len())
			.filter_map(|position| {
				self.words
					.get(&sentence[position])?
					.most_probable(&sentence, position + 1, self)
			})
			.next()
			.and_then(|id| self.word(id))
			.map(|word| word.input().to_owned())
	}

	/// Plain words that may follow `seed`, most probable first, taken from the
	/// longest context that has any.
	pub fn next_candidate_words(&self, seed: &str) -> Vec<String> {
		let sentence = self.seed_sentence(seed);
		for position in self.window(sentence.len()) {
			let Some(word) = self.words.get(&sentence[position]) else {
				continue;
			};
			let candidates: Vec<String> = word
				.candidates(&sentence, position + 1)
				.into_iter()
				.filter_map(|id| self.word(id))
				.filter(|word| !word.is_marker())
				.map(|word| word.input().to_owned())
				.collect();
			if !candidates.is_empty() {
				return candidates;
			}
		}
		Vec::new()
	}

	/// Text listing of every trie, one node per line.
	pub fn dump(&self) -> String {
		let label = |id: WordId| self.word(id).map(|word| word.input().to_owned()).unwrap_or_default();
		let mut out = String::new();
		for word in self.words.values() {
			word.gram().write_tree(&mut out, &label);
		}
		out
	}
}

/// Tokenizes a seed like ingested text, keeping marker tokens typed
/// literally (`<q>`, `</p>`, ...) as they are.
fn seed_tokens(seed: &str) -> Vec<String> {
	let is_marker = |piece: &str| {
		MARKER_PAIRS
			.iter()
			.any(|((begin, _), (end, _))| piece == *begin || piece == *end)
	};

	let mut tokens = Vec::new();
	let mut text = String::new();
	for piece in seed.split_whitespace() {
		if is_marker(piece) {
			tokens.extend(parser::parse(&text));
			text.clear();
			tokens.push(piece.to_owned());
		} else {
			text.push_str(piece);
			text.push(' ');
		}
	}
	tokens.extend(parser::parse(&text));
	tokens
}
