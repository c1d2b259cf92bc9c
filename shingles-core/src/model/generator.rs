use rand::Rng;
use tracing::{debug, trace};

use super::dictionary::Dictionary;
use super::word::{Role, RoleLookup, WordId};

/// Tokens glued to the word before them when rendering.
const PUNCTUATION: &[char] = &['.', ',', ':', ';', '!', '?', '…'];

/// State of one generation.
///
/// The walk appends words one at a time until every open marker, the
/// implicit sentence marker included, has been closed. When no context
/// yields a word it backs off: the sentence is cut back further behind its
/// longest confirmed length on each consecutive failure, but never into the
/// seed.
struct Walk<'a> {
	dictionary: &'a Dictionary,
	/// Words so far, starting with `<s>`.
	sentence: Vec<WordId>,
	/// Open markers, innermost last.
	marker_stack: Vec<WordId>,
	/// Length of `<s>` plus the seed words; never rolled back past.
	seed_len: usize,
	/// Longest sentence length reached so far.
	retry_position: usize,
	/// Consecutive failed extensions since the last new high-water mark.
	back_off: usize,
	/// Set once the sentence grew past the cap, biases towards closing.
	finish_sentence: bool,
}

impl<'a> Walk<'a> {
	fn new(dictionary: &'a Dictionary, seed: &str) -> Self {
		let mut walk = Self {
			dictionary,
			sentence: vec![dictionary.begin],
			marker_stack: vec![dictionary.begin],
			seed_len: 1,
			retry_position: 1,
			back_off: 0,
			finish_sentence: false,
		};

		for id in dictionary.resolve_seed(seed) {
			match dictionary.role_of(id) {
				Role::End { begin } if walk.marker_stack.last() != Some(&begin) => {
					debug!(id, "seed end marker does not close anything, skipped");
					continue;
				}
				Role::End { .. } => {
					walk.marker_stack.pop();
				}
				Role::Begin { .. } if walk.marker_stack.last() == Some(&id) => {
					debug!(id, "seed marker already open, skipped");
					continue;
				}
				Role::Begin { .. } => walk.marker_stack.push(id),
				Role::Plain => (),
			}
			walk.sentence.push(id);
		}

		walk.seed_len = walk.sentence.len();
		walk.retry_position = walk.seed_len;
		walk.finish_sentence = walk.seed_len > dictionary.config.sentence_cap();
		walk
	}

	/// Drives the walk to completion. `None` on a dead end.
	fn run<R: Rng>(mut self, rng: &mut R) -> Option<Vec<WordId>> {
		let max_steps = self.dictionary.config.max_steps();
		let mut steps = 0;

		while let Some(&top) = self.marker_stack.last() {
			if steps == max_steps {
				debug!(steps, len = self.sentence.len(), "generation step budget exhausted");
				return None;
			}
			steps += 1;

			match self.extend(rng) {
				Some(id) => self.accept(id, top),
				None => {
					if !self.back_off() {
						return None;
					}
				}
			}
		}

		Some(self.sentence)
	}

	/// Queries the tries from the longest context to the shortest and returns
	/// the first word found.
	fn extend<R: Rng>(&self, rng: &mut R) -> Option<WordId> {
		let dictionary = self.dictionary;
		for position in dictionary.window(self.sentence.len()) {
			let Some(word) = dictionary.word(self.sentence[position]) else {
				continue;
			};
			trace!(position, context = self.sentence.len() - position, "querying context");
			let next = word.next(
				&self.sentence,
				position + 1,
				&self.marker_stack,
				self.finish_sentence,
				dictionary,
				rng,
			);
			if next.is_some() {
				return next;
			}
		}
		None
	}

	fn accept(&mut self, id: WordId, top: WordId) {
		self.sentence.push(id);
		match self.dictionary.role_of(id) {
			Role::Begin { .. } => self.marker_stack.push(id),
			Role::End { begin } if begin == top => {
				self.marker_stack.pop();
			}
			_ => (),
		}

		if self.sentence.len() > self.retry_position {
			self.retry_position = self.sentence.len();
			self.back_off = 0;
		}
		if self.sentence.len() > self.dictionary.config.sentence_cap() {
			self.finish_sentence = true;
		}
	}

	/// Rolls the sentence back one step further than last time.
	///
	/// Returns `false` when the roll-back point would cut into the seed.
	fn back_off(&mut self) -> bool {
		self.back_off += 1;
		let target = match self.retry_position.checked_sub(self.back_off) {
			Some(target) if target >= self.seed_len => target,
			_ => {
				debug!(
					len = self.sentence.len(),
					back_off = self.back_off,
					"generation dead end, no sentence produced"
				);
				return false;
			}
		};

		debug!(from = self.sentence.len(), to = target, "rolling back");
		self.sentence.truncate(target);
		self.marker_stack = self.replay_markers();
		true
	}

	/// Marker stack implied by the current sentence.
	fn replay_markers(&self) -> Vec<WordId> {
		let mut stack = Vec::new();
		for id in &self.sentence {
			match self.dictionary.role_of(*id) {
				Role::Begin { .. } => stack.push(*id),
				Role::End { begin } if stack.last() == Some(&begin) => {
					stack.pop();
				}
				_ => (),
			}
		}
		stack
	}
}

impl Dictionary {
	/// Generates a sentence continuing `seed` using the thread RNG.
	///
	/// Returns an empty string on a dead end.
	pub fn generate(&self, seed: &str) -> String {
		self.generate_with(seed, &mut rand::rng())
	}

	/// Generates a sentence continuing `seed` with the given RNG.
	pub fn generate_with<R: Rng>(&self, seed: &str, rng: &mut R) -> String {
		self.generate_tokens(seed, rng)
			.map(|sentence| self.render(&sentence))
			.unwrap_or_default()
	}

	/// Generates the word ids of a complete sentence, from `<s>` to `</s>`.
	///
	/// Words of `seed` unknown to the dictionary are skipped. Returns `None`
	/// when generation runs into a dead end.
	///
	/// # Notes
	/// - `recompute_probabilities` must have run since the last ingestion.
	pub fn generate_tokens<R: Rng>(&self, seed: &str, rng: &mut R) -> Option<Vec<WordId>> {
		Walk::new(self, seed).run(rng)
	}

	/// Turns word ids back into text.
	///
	/// Invisible markers are dropped, punctuation and closing markers stick
	/// to the word before them, opening markers to the word after them,
	/// apostrophes to both, and the first letter is uppercased.
	pub fn render(&self, sentence: &[WordId]) -> String {
		let mut text = String::new();
		let mut glue_next = true;

		for word in sentence.iter().filter_map(|id| self.word(*id)) {
			let output = word.output();
			if output.is_empty() {
				continue;
			}

			let apostrophe = output == "'";
			let glue = glue_next
				|| apostrophe
				|| word.is_end_marker()
				|| output.chars().all(|c| PUNCTUATION.contains(&c));
			if !glue {
				text.push(' ');
			}
			text.push_str(output);
			glue_next = apostrophe || word.is_begin_marker();
		}

		capitalize(&mut text);
		text
	}
}

/// Uppercases the first alphabetic character.
fn capitalize(text: &mut String) {
	if let Some((index, c)) = text.char_indices().find(|(_, c)| c.is_alphabetic()) {
		let upper: String = c.to_uppercase().collect();
		text.replace_range(index..index + c.len_utf8(), &upper);
	}
}
