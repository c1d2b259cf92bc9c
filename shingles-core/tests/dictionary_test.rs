//! Registry, ingestion, probabilities and next-word queries.

use shingles_core::model::gram::Gram;
use shingles_core::{Dictionary, GeneratorConfig, Role, Segmentation};

fn trained(n: usize, sentences: &[&[&str]]) -> Dictionary {
	let mut dictionary = Dictionary::with_order(n).unwrap();
	for &sentence in sentences {
		dictionary.ingest(sentence);
	}
	dictionary.recompute_probabilities();
	dictionary
}

fn children_of<'a>(dictionary: &'a Dictionary, gram: &'a Gram) -> Vec<&'a str> {
	gram.children()
		.map(|child| dictionary.word(child.word()).unwrap().input())
		.collect()
}

fn root<'a>(dictionary: &'a Dictionary, text: &str) -> &'a Gram {
	dictionary.word_by_text(text).unwrap().gram()
}

fn assert_children_sum_to_one(gram: &Gram) {
	if gram.children().next().is_some() {
		let sum: f64 = gram.children().map(Gram::probability).sum();
		assert!((sum - 1.0).abs() < 1e-9, "children of {} sum to {sum}", gram.word());
	}
	for child in gram.children() {
		assert_children_sum_to_one(child);
	}
}

// ── Registry ─────────────────────────────────────────────────────────────

#[test]
fn fresh_dictionary_holds_paired_markers() {
	let dictionary = Dictionary::default();
	assert_eq!(dictionary.len(), 6);

	let expected = [
		("<s>", Role::Begin { end: 1 }),
		("</s>", Role::End { begin: 0 }),
		("<q>", Role::Begin { end: 3 }),
		("</q>", Role::End { begin: 2 }),
		("<p>", Role::Begin { end: 5 }),
		("</p>", Role::End { begin: 4 }),
	];
	for (id, (input, role)) in expected.iter().enumerate() {
		let word = dictionary.word_by_text(input).unwrap();
		assert_eq!(word.id(), id as u64);
		assert_eq!(word.role(), *role);
		assert!(word.is_marker());
	}

	assert_eq!(dictionary.word(0).unwrap().output(), "");
	assert_eq!(dictionary.word(2).unwrap().output(), "\"");
	assert_eq!(dictionary.word(4).unwrap().output(), "(");
	assert_eq!(dictionary.word(5).unwrap().counterpart(), Some(4));
}

#[test]
fn plain_words_have_no_counterpart() {
	let dictionary = trained(3, &[&["hello", "."]]);
	let word = dictionary.word_by_text("hello").unwrap();
	assert_eq!(word.role(), Role::Plain);
	assert_eq!(word.counterpart(), None);
	assert!(!word.is_begin_marker() && !word.is_end_marker());
}

// ── Ingestion ────────────────────────────────────────────────────────────

#[test]
fn ingest_registers_words_in_order() {
	let mut dictionary = Dictionary::with_order(3).unwrap();
	assert_eq!(dictionary.ingest(&["the", "cat", "sat", "."]), 1);
	assert_eq!(dictionary.len(), 10);
	assert_eq!(dictionary.word_by_text("the").unwrap().id(), 6);
	assert_eq!(dictionary.word_by_text(".").unwrap().id(), 9);

	// Known words keep their id
	dictionary.ingest(&["the", "dog", "."]);
	assert_eq!(dictionary.word_by_text("the").unwrap().id(), 6);
	assert_eq!(dictionary.word_by_text("dog").unwrap().id(), 10);
}

#[test]
fn every_suffix_is_indexed_up_to_the_order() {
	let dictionary = trained(3, &[&["the", "cat", "sat", "."]]);

	let begin = root(&dictionary, "<s>");
	assert_eq!(begin.count(), 1);
	assert_eq!(children_of(&dictionary, begin), vec!["the"]);

	let cat = root(&dictionary, "cat");
	let sat = cat.children().next().unwrap();
	assert_eq!(children_of(&dictionary, sat), vec!["."]);
	assert_eq!(sat.depth(), 1);
	assert_eq!(sat.children().next().unwrap().children().count(), 0);

	let end = root(&dictionary, "</s>");
	assert_eq!(end.count(), 1);
	assert_eq!(end.children().count(), 0);

	for word in dictionary.words() {
		assert!(word.gram().max_depth() <= 2);
	}
}

#[test]
fn empty_input_indexes_nothing() {
	let mut dictionary = Dictionary::default();
	let empty: [&str; 0] = [];
	assert_eq!(dictionary.ingest(&empty), 0);
	assert_eq!(dictionary.ingest(&["", "  "]), 0);
	assert_eq!(root(&dictionary, "<s>").count(), 0);
}

#[test]
fn sentence_markers_in_the_stream_delimit_sentences() {
	let mut dictionary = Dictionary::default();
	let indexed = dictionary.ingest(&["<s>", "a", "b", "</s>", "<s>", "c", "</s>", "</s>"]);
	assert_eq!(indexed, 2);
	assert_eq!(root(&dictionary, "<s>").count(), 2);
	assert_eq!(children_of(&dictionary, root(&dictionary, "b")), vec!["</s>"]);
}

#[test]
fn unterminated_sentence_closes_open_markers() {
	let dictionary = trained(3, &[&["she", "said", "<q>", "<p>", "hello"]]);

	assert_eq!(children_of(&dictionary, root(&dictionary, "hello")), vec!["</p>"]);
	let close_paren = root(&dictionary, "</p>").children().next().unwrap();
	assert_eq!(dictionary.word(close_paren.word()).unwrap().input(), "</q>");
	assert_eq!(children_of(&dictionary, root(&dictionary, "</q>")), vec!["</s>"]);
}

#[test]
fn end_marker_closes_inner_markers_or_is_dropped() {
	let dictionary = trained(2, &[&["a", "</q>", "b", "<q>", "<p>", "c", "</q>", "."]]);

	// Stray `</q>` dropped
	assert_eq!(children_of(&dictionary, root(&dictionary, "a")), vec!["b"]);
	// `</q>` closes the open `<p>` first
	assert_eq!(children_of(&dictionary, root(&dictionary, "c")), vec!["</p>"]);
	assert_eq!(children_of(&dictionary, root(&dictionary, "</p>")), vec!["</q>"]);
}

#[test]
fn top_level_segmentation_ignores_punctuation_inside_quotes() {
	let tokens = ["<q>", "hi", ".", "bye", "</q>", "."];
	let mut dictionary = Dictionary::default();
	assert_eq!(dictionary.ingest(&tokens), 1);
	dictionary.recompute_probabilities();

	let period = root(&dictionary, ".");
	assert_eq!(period.count(), 2);
	assert_eq!(children_of(&dictionary, period), vec!["</s>", "bye"]);
}

#[test]
fn eager_segmentation_splits_inside_quotes() {
	let tokens = ["<q>", "hi", ".", "bye", "</q>", "."];
	let mut config = GeneratorConfig::default();
	config.segmentation = Segmentation::Eager;
	let mut dictionary = Dictionary::new(config);
	assert_eq!(dictionary.ingest(&tokens), 2);
	dictionary.recompute_probabilities();

	assert_eq!(root(&dictionary, "<s>").count(), 2);
	assert_eq!(children_of(&dictionary, root(&dictionary, ".")), vec!["</s>", "</q>"]);
	// The trailing `</q>` had nothing left to close
	assert_eq!(children_of(&dictionary, root(&dictionary, "bye")), vec!["."]);
}

// ── Probabilities ────────────────────────────────────────────────────────

#[test]
fn probabilities_sum_to_one_at_every_node() {
	let dictionary = trained(
		4,
		&[
			&["the", "cat", "sat", "on", "the", "mat", "."],
			&["the", "dog", "said", "<q>", "woof", "</q>", "."],
			&["a", "cat", "<p>", "or", "a", "dog", "</p>", "sat", "!"],
		],
	);

	let roots: f64 = dictionary.words().map(|word| word.gram().probability()).sum();
	assert!((roots - 1.0).abs() < 1e-9);
	for word in dictionary.words() {
		assert_children_sum_to_one(word.gram());
	}
}

#[test]
fn recomputing_twice_changes_nothing() {
	let mut dictionary = trained(3, &[&["a", "b", "c", "."], &["a", "c", "b", "."]]);
	let before: Vec<Gram> = dictionary.words().map(|word| word.gram().clone()).collect();
	dictionary.recompute_probabilities();
	let after: Vec<Gram> = dictionary.words().map(|word| word.gram().clone()).collect();
	assert_eq!(before, after);
}

#[test]
fn probabilities_are_zero_before_recomputation() {
	let mut dictionary = Dictionary::default();
	dictionary.ingest(&["a", "b", "."]);
	assert!(dictionary.words().all(|word| word.gram().probability() == 0.0));
}

// ── Queries ──────────────────────────────────────────────────────────────

#[test]
fn single_candidate_is_most_probable() {
	let dictionary = trained(3, &[&["hello", "world", "."]]);
	assert_eq!(dictionary.next_most_probable_word("hello").as_deref(), Some("world"));
	assert_eq!(dictionary.next_most_probable_word("Hello World").as_deref(), Some("."));
	assert_eq!(dictionary.next_most_probable_word("").as_deref(), Some("hello"));
}

#[test]
fn seed_is_tokenized_like_ingested_text() {
	let dictionary = trained(3, &[&["hello", ",", "world", "."]]);
	assert_eq!(dictionary.next_most_probable_word("Hello,").as_deref(), Some("world"));
	assert_eq!(dictionary.next_candidate_words("HELLO, WORLD"), vec!["."]);
}

#[test]
fn most_probable_backs_off_to_shorter_context() {
	let dictionary = trained(3, &[&["hello", "world", "."], &["big", "world", "again", "."]]);
	// "<s> world" was never seen, "world" alone was
	let next = dictionary.next_most_probable_word("world");
	assert!(matches!(next.as_deref(), Some(".") | Some("again")));
	assert_eq!(dictionary.next_most_probable_word("unknown").as_deref(), Some("hello"));
}

#[test]
fn candidates_are_ranked_by_probability() {
	let dictionary = trained(
		3,
		&[
			&["the", "cat", "sat", "."],
			&["the", "dog", "sat", "."],
			&["the", "dog", "ran", "."],
		],
	);
	assert_eq!(dictionary.next_candidate_words("the"), vec!["dog", "cat"]);
	assert_eq!(dictionary.next_candidate_words("the dog"), vec!["sat", "ran"]);
	assert!(dictionary.next_candidate_words("the dog ran .").is_empty());
}

#[test]
fn order_one_never_looks_past_a_single_word() {
	let dictionary = trained(1, &[&["the", "cat", "sat", "."], &["the", "dog", "sat", "."]]);

	for word in dictionary.words() {
		assert_eq!(word.gram().max_depth(), 0);
	}
	assert_eq!(root(&dictionary, "the").count(), 2);
	assert!(dictionary.next_candidate_words("the").is_empty());
	assert_eq!(dictionary.next_most_probable_word("the cat"), None);
	assert_eq!(dictionary.generate("the"), "");
}

#[test]
fn dump_lists_every_node() {
	let dictionary = trained(2, &[&["hi", "."]]);
	let dump = dictionary.dump();
	assert!(dump.contains("6:hi (1-"));
	assert!(dump.contains("    7:. (1-1)"));
	assert_eq!(dump.lines().count(), 11);
}
