use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;

use rand::Rng;

use super::word::{Role, RoleLookup, WordId};

/// A node of the context trie owned by a word.
///
/// The root node belongs to the word itself; each level below records which
/// word followed the path leading to it and how many times. A root plus
/// `n - 1` levels of children therefore stores every observed n-gram
/// starting with the owning word.
///
/// ## Responsibilities:
/// - Count observations while ingesting sentences
/// - Derive conditional probabilities level by level
/// - Match a context path and sample a continuation under marker constraints
///
/// ## Invariants
/// - `depth` of a child is its parent's depth + 1 and never exceeds `n - 1`
/// - Counts only grow; nodes are never removed
/// - After `recompute_probability`, the probabilities of the children of any
///   node sum to 1.0 (or the node has no children)
#[derive(Clone, Debug, PartialEq)]
pub struct Gram {
	/// Word reached through this node.
	word: WordId,
	/// Number of times the path to this node was observed.
	count: u64,
	/// `count` divided by the total of this node and its siblings.
	probability: f64,
	/// Distance from the root.
	depth: usize,
	/// Children indexed by the id of the following word.
	/// Ordered so the sampling walk is stable.
	grams: BTreeMap<WordId, Gram>,
}

impl Gram {
	pub(crate) fn new(word: WordId, depth: usize) -> Self {
		Self { word, count: 0, probability: 0.0, depth, grams: BTreeMap::new() }
	}

	/// Rebuilds a node from persisted counts. Probability stays at zero until
	/// the next recomputation.
	pub(crate) fn restore(word: WordId, count: u64, depth: usize, grams: BTreeMap<WordId, Gram>) -> Self {
		Self { word, count, probability: 0.0, depth, grams }
	}

	pub fn word(&self) -> WordId {
		self.word
	}

	pub fn count(&self) -> u64 {
		self.count
	}

	pub fn probability(&self) -> f64 {
		self.probability
	}

	pub fn depth(&self) -> usize {
		self.depth
	}

	/// Iterates the children in id order.
	pub fn children(&self) -> impl Iterator<Item = &Gram> {
		self.grams.values()
	}

	/// Depth of the deepest node below (and including) this one.
	pub fn max_depth(&self) -> usize {
		self.grams.values().map(Gram::max_depth).max().unwrap_or(self.depth)
	}

	/// Records one more occurrence of this node and extends the path with the
	/// word at `position + 1`, as long as `remaining` allows.
	pub(crate) fn observe(&mut self, sentence: &[WordId], position: usize, remaining: usize) {
		self.count += 1;

		let next = position + 1;
		if remaining > 1 && next < sentence.len() {
			let id = sentence[next];
			let depth = self.depth + 1;
			self.grams
				.entry(id)
				.or_insert_with(|| Gram::new(id, depth))
				.observe(sentence, next, remaining - 1);
		}
	}

	/// Sets this node's probability against `total` and renormalizes every
	/// level below over its own siblings.
	pub(crate) fn recompute_probability(&mut self, total: u64) {
		self.probability = if total == 0 { 0.0 } else { self.count as f64 / total as f64 };

		let children_total: u64 = self.grams.values().map(|gram| gram.count).sum();
		for gram in self.grams.values_mut() {
			gram.recompute_probability(children_total);
		}
	}

	/// Follows `sentence[position..]` down the trie.
	///
	/// Returns `None` as soon as a word of the path has no child.
	fn matched(&self, sentence: &[WordId], position: usize) -> Option<&Gram> {
		let mut gram = self;
		for id in &sentence[position.min(sentence.len())..] {
			gram = gram.grams.get(id)?;
		}
		Some(gram)
	}

	/// Matches `sentence[position..]` then samples a continuation.
	///
	/// Returns `None` if the path breaks (the caller should retry with a
	/// shorter context) or if every child was rejected.
	pub(crate) fn query_next<L, R>(
		&self,
		sentence: &[WordId],
		position: usize,
		marker_stack: &[WordId],
		finish_sentence: bool,
		roles: &L,
		rng: &mut R,
	) -> Option<&Gram>
	where
		L: RoleLookup + ?Sized,
		R: Rng,
	{
		self.matched(sentence, position)?
			.sample(marker_stack, finish_sentence, roles, rng)
	}

	/// Weighted sampling over the children with rejection.
	///
	/// A rejected child is removed from the draw and its probability mass is
	/// subtracted, so each redraw only lands on children not yet tried.
	fn sample<L, R>(&self, marker_stack: &[WordId], finish_sentence: bool, roles: &L, rng: &mut R) -> Option<&Gram>
	where
		L: RoleLookup + ?Sized,
		R: Rng,
	{
		if self.grams.is_empty() {
			return None;
		}

		let top = marker_stack.last().copied();

		// Closing the innermost marker wins outright while finishing
		if finish_sentence {
			if let Some(closing) = top.and_then(|id| roles.role_of(id).counterpart()) {
				if let Some(gram) = self.grams.get(&closing) {
					return Some(gram);
				}
			}
		}

		let mut skipped: HashSet<WordId> = HashSet::new();
		let mut remaining = 1.0_f64;

		while skipped.len() < self.grams.len() && remaining > f64::EPSILON {
			let draw = rng.random_range(0.0..remaining);

			let mut cumulative = 0.0;
			let mut candidate: Option<&Gram> = None;
			for gram in self.grams.values().filter(|gram| !skipped.contains(&gram.word)) {
				cumulative += gram.probability;
				candidate = Some(gram);
				if draw < cumulative {
					break;
				}
			}

			// Rounding can leave the draw past the last interval; the last
			// remaining child takes it.
			let gram = candidate?;
			if Self::admissible(roles.role_of(gram.word), gram.word, top, finish_sentence) {
				return Some(gram);
			}

			skipped.insert(gram.word);
			remaining -= gram.probability;
		}

		None
	}

	/// Marker rules for a sampled word.
	fn admissible(role: Role, id: WordId, top: Option<WordId>, finish_sentence: bool) -> bool {
		match role {
			Role::Plain => true,
			Role::Begin { .. } => !finish_sentence && top != Some(id),
			Role::End { begin } => top == Some(begin),
		}
	}

	/// Children of the matched node, most probable first.
	pub(crate) fn ranked_candidates(&self, sentence: &[WordId], position: usize) -> Vec<&Gram> {
		let Some(gram) = self.matched(sentence, position) else {
			return Vec::new();
		};

		let mut candidates: Vec<&Gram> = gram.grams.values().collect();
		candidates.sort_by(|a, b| b.probability.total_cmp(&a.probability).then(a.word.cmp(&b.word)));
		candidates
	}

	/// Most probable non-marker child of the matched node. Ties go to the
	/// lowest id.
	pub(crate) fn most_probable<L: RoleLookup + ?Sized>(&self, sentence: &[WordId], position: usize, roles: &L) -> Option<&Gram> {
		self.matched(sentence, position)?
			.grams
			.values()
			.filter(|gram| roles.role_of(gram.word) == Role::Plain)
			.fold(None, |best: Option<&Gram>, gram| match best {
				Some(b) if b.probability >= gram.probability => Some(b),
				_ => Some(gram),
			})
	}

	/// Appends an indented listing of this subtree to `out`.
	pub(crate) fn write_tree<F>(&self, out: &mut String, label: &F)
	where
		F: Fn(WordId) -> String,
	{
		// Writing into a String cannot fail
		let _ = writeln!(
			out,
			"{}{}:{} ({}-{})",
			" ".repeat(self.depth * 4),
			self.word,
			label(self.word),
			self.count,
			self.probability
		);
		for gram in self.grams.values() {
			gram.write_tree(out, label);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use std::collections::HashMap;

	struct Roles(HashMap<WordId, Role>);

	impl RoleLookup for Roles {
		fn role_of(&self, id: WordId) -> Role {
			self.0.get(&id).copied().unwrap_or_default()
		}
	}

	fn roles() -> Roles {
		Roles(HashMap::from([
			(0, Role::Begin { end: 1 }),
			(1, Role::End { begin: 0 }),
			(2, Role::Begin { end: 3 }),
			(3, Role::End { begin: 2 }),
		]))
	}

	#[test]
	fn observe_stops_at_remaining_depth() {
		let mut root = Gram::new(10, 0);
		root.observe(&[10, 11, 12, 13], 0, 3);

		assert_eq!(root.count(), 1);
		assert_eq!(root.max_depth(), 2);
		let child = root.children().next().unwrap();
		assert_eq!(child.word(), 11);
		assert_eq!(child.children().next().unwrap().word(), 12);
	}

	#[test]
	fn probabilities_are_conditional_per_level() {
		let mut root = Gram::new(10, 0);
		root.observe(&[10, 11], 0, 2);
		root.observe(&[10, 11], 0, 2);
		root.observe(&[10, 12], 0, 2);
		root.recompute_probability(6);

		assert!((root.probability() - 0.5).abs() < 1e-12);
		let probabilities: Vec<f64> = root.children().map(Gram::probability).collect();
		assert!((probabilities[0] - 2.0 / 3.0).abs() < 1e-12);
		assert!((probabilities[1] - 1.0 / 3.0).abs() < 1e-12);
	}

	#[test]
	fn zero_total_gives_zero_probability() {
		let mut root = Gram::new(10, 0);
		root.recompute_probability(0);
		assert_eq!(root.probability(), 0.0);
	}

	#[test]
	fn broken_path_is_no_match() {
		let mut root = Gram::new(10, 0);
		root.observe(&[10, 11, 12], 0, 3);
		root.recompute_probability(1);

		let mut rng = StdRng::seed_from_u64(1);
		let roles = roles();
		assert!(root.query_next(&[10, 99], 1, &[0], false, &roles, &mut rng).is_none());
		let next = root.query_next(&[10, 11], 1, &[0], false, &roles, &mut rng);
		assert_eq!(next.map(Gram::word), Some(12));
	}

	#[test]
	fn rejects_wrong_closing_marker_and_nested_same_marker() {
		let mut root = Gram::new(10, 0);
		root.observe(&[10, 2], 0, 2);
		root.observe(&[10, 3], 0, 2);
		root.recompute_probability(2);

		let roles = roles();
		let mut rng = StdRng::seed_from_u64(7);
		// `<q>` already open: neither reopening it nor closing `<s>` is allowed,
		// only `</q>` is
		for _ in 0..50 {
			let next = root.query_next(&[10], 1, &[0, 2], false, &roles, &mut rng);
			assert_eq!(next.map(Gram::word), Some(3));
		}
		// Nothing valid when `<s>` is on top and `</q>` cannot close it
		for _ in 0..50 {
			let next = root.query_next(&[10], 1, &[0], true, &roles, &mut rng);
			assert!(next.is_none());
		}
	}

	#[test]
	fn finish_mode_prefers_closing_marker() {
		let mut root = Gram::new(10, 0);
		for _ in 0..99 {
			root.observe(&[10, 11], 0, 2);
		}
		root.observe(&[10, 1], 0, 2);
		root.recompute_probability(100);

		let roles = roles();
		let mut rng = StdRng::seed_from_u64(3);
		for _ in 0..20 {
			let next = root.query_next(&[10], 1, &[0], true, &roles, &mut rng);
			assert_eq!(next.map(Gram::word), Some(1));
		}
	}

	#[test]
	fn most_probable_skips_markers() {
		let mut root = Gram::new(10, 0);
		for _ in 0..5 {
			root.observe(&[10, 1], 0, 2);
		}
		root.observe(&[10, 11], 0, 2);
		root.observe(&[10, 12], 0, 2);
		root.observe(&[10, 12], 0, 2);
		root.recompute_probability(8);

		let best = root.most_probable(&[10], 1, &roles());
		assert_eq!(best.map(Gram::word), Some(12));

		let ranked: Vec<WordId> = root.ranked_candidates(&[10], 1).into_iter().map(Gram::word).collect();
		assert_eq!(ranked, vec![1, 12, 11]);
	}
}
