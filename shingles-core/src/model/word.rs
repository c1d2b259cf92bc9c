use rand::Rng;

use super::gram::Gram;

/// Stable identifier of a word inside a `Dictionary`.
pub type WordId = u64;

/// Structural role of a word.
///
/// Markers come in begin/end pairs that must open and close like brackets.
/// The counterpart is stored by id so the pair never forms an ownership cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Role {
	#[default]
	Plain,
	Begin { end: WordId },
	End { begin: WordId },
}

impl Role {
	/// Returns the id of the matching marker, `None` for plain words.
	pub fn counterpart(&self) -> Option<WordId> {
		match self {
			Role::Plain => None,
			Role::Begin { end } => Some(*end),
			Role::End { begin } => Some(*begin),
		}
	}
}

/// Read access to word roles by id.
///
/// The trie only stores ids, so validity checks during sampling go through
/// this lookup. Unknown ids are reported as `Role::Plain`.
pub trait RoleLookup {
	fn role_of(&self, id: WordId) -> Role;
}

/// A unique unit of text known to the model.
///
/// ## Responsibilities:
/// - Hold the lookup text (`input`) and the rendered text (`output`)
/// - Carry its marker role
/// - Own the context trie rooted at itself
///
/// ## Invariants
/// - `id` never changes once assigned
/// - A `Begin` word's counterpart is an `End` word pointing back, and vice versa
#[derive(Clone, Debug)]
pub struct Word {
	id: WordId,
	input: String,
	output: String,
	role: Role,
	gram: Gram,
}

impl Word {
	/// Creates a plain word with an empty trie rooted at itself.
	pub fn new(id: WordId, input: &str, output: &str) -> Self {
		Self {
			id,
			input: input.to_owned(),
			output: output.to_owned(),
			role: Role::Plain,
			gram: Gram::new(id, 0),
		}
	}

	/// Creates a word around an already built trie (used when loading).
	pub(crate) fn with_gram(id: WordId, input: String, output: String, gram: Gram) -> Self {
		Self { id, input, output, role: Role::Plain, gram }
	}

	pub fn id(&self) -> WordId {
		self.id
	}

	pub fn input(&self) -> &str {
		&self.input
	}

	pub fn output(&self) -> &str {
		&self.output
	}

	pub fn role(&self) -> Role {
		self.role
	}

	pub fn gram(&self) -> &Gram {
		&self.gram
	}

	pub fn is_marker(&self) -> bool {
		self.role != Role::Plain
	}

	pub fn is_begin_marker(&self) -> bool {
		matches!(self.role, Role::Begin { .. })
	}

	pub fn is_end_marker(&self) -> bool {
		matches!(self.role, Role::End { .. })
	}

	/// Returns the matching marker id, `None` if this word is not a marker.
	pub fn counterpart(&self) -> Option<WordId> {
		self.role.counterpart()
	}

	/// Marks this word as the opening side of the pair closed by `end`.
	pub(crate) fn pair_as_begin_of(&mut self, end: WordId) {
		self.role = Role::Begin { end };
	}

	/// Marks this word as the closing side of the pair opened by `begin`.
	pub(crate) fn pair_as_end_of(&mut self, begin: WordId) {
		self.role = Role::End { begin };
	}

	/// Indexes the continuation of `sentence` starting at `position`.
	pub(crate) fn record_continuation(&mut self, sentence: &[WordId], position: usize, n: usize) {
		self.gram.observe(sentence, position, n);
	}

	pub(crate) fn recompute_probabilities(&mut self, total: u64) {
		self.gram.recompute_probability(total);
	}

	/// Samples the word following `sentence`, matching from `position` on.
	pub(crate) fn next<L, R>(
		&self,
		sentence: &[WordId],
		position: usize,
		marker_stack: &[WordId],
		finish_sentence: bool,
		roles: &L,
		rng: &mut R,
	) -> Option<WordId>
	where
		L: RoleLookup + ?Sized,
		R: Rng,
	{
		self.gram
			.query_next(sentence, position, marker_stack, finish_sentence, roles, rng)
			.map(Gram::word)
	}

	pub(crate) fn candidates(&self, sentence: &[WordId], position: usize) -> Vec<WordId> {
		self.gram
			.ranked_candidates(sentence, position)
			.into_iter()
			.map(Gram::word)
			.collect()
	}

	pub(crate) fn most_probable<L: RoleLookup + ?Sized>(&self, sentence: &[WordId], position: usize, roles: &L) -> Option<WordId> {
		self.gram.most_probable(sentence, position, roles).map(Gram::word)
	}
}
