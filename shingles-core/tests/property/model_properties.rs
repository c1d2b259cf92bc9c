use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use shingles_core::model::gram::Gram;
use shingles_core::{Dictionary, GeneratorConfig, Role, WordId};

const VOCABULARY: &[&str] = &[
	"the", "cat", "dog", "sat", "ran", "a", "big", "said", ".", ",", "!", "?", "<q>", "</q>", "<p>", "</p>",
];

fn token_stream() -> impl Strategy<Value = Vec<&'static str>> {
	prop::collection::vec(prop::sample::select(VOCABULARY), 0..60)
}

fn build(n: usize, tokens: &[&str]) -> Dictionary {
	let mut dictionary = Dictionary::new(GeneratorConfig::new(n).unwrap());
	dictionary.ingest(tokens);
	dictionary.recompute_probabilities();
	dictionary
}

fn check_node(gram: &Gram, n: usize) -> Result<(), TestCaseError> {
	prop_assert!(gram.depth() < n);
	if gram.children().next().is_some() {
		let sum: f64 = gram.children().map(Gram::probability).sum();
		prop_assert!((sum - 1.0).abs() < 1e-9, "children sum to {}", sum);
	}
	for child in gram.children() {
		prop_assert_eq!(child.depth(), gram.depth() + 1);
		check_node(child, n)?;
	}
	Ok(())
}

fn balanced(dictionary: &Dictionary, sentence: &[WordId]) -> bool {
	let mut stack: Vec<WordId> = Vec::new();
	for id in sentence {
		match dictionary.word(*id).map(|word| word.role()) {
			Some(Role::Begin { .. }) => {
				if stack.last() == Some(id) {
					return false;
				}
				stack.push(*id);
			}
			Some(Role::End { begin }) => {
				if stack.pop() != Some(begin) {
					return false;
				}
			}
			Some(Role::Plain) => (),
			None => return false,
		}
	}
	stack.is_empty()
}

proptest! {
	#[test]
	fn children_probabilities_sum_to_one(tokens in token_stream(), n in 1usize..5) {
		let dictionary = build(n, &tokens);
		for word in dictionary.words() {
			check_node(word.gram(), n)?;
		}
	}

	#[test]
	fn recomputation_is_idempotent(tokens in token_stream(), n in 1usize..5) {
		let mut dictionary = build(n, &tokens);
		let before: Vec<Gram> = dictionary.words().map(|word| word.gram().clone()).collect();
		dictionary.recompute_probabilities();
		let after: Vec<Gram> = dictionary.words().map(|word| word.gram().clone()).collect();
		prop_assert_eq!(before, after);
	}

	#[test]
	fn document_round_trip_is_lossless(tokens in token_stream(), n in 1usize..5) {
		let dictionary = build(n, &tokens);
		let document = dictionary.to_document();
		let restored = Dictionary::from_document(document.clone(), GeneratorConfig::default()).unwrap();
		prop_assert_eq!(restored.to_document(), document);
	}

	#[test]
	fn generated_sentences_are_balanced(tokens in token_stream(), n in 1usize..5, seed in any::<u64>()) {
		let dictionary = build(n, &tokens);
		let mut rng = StdRng::seed_from_u64(seed);
		if let Some(sentence) = dictionary.generate_tokens("", &mut rng) {
			prop_assert_eq!(sentence.first().copied(), Some(dictionary.begin_sentence()));
			prop_assert_eq!(sentence.last().copied(), Some(dictionary.end_sentence()));
			prop_assert!(balanced(&dictionary, &sentence));
		}
	}
}
