use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use super::config::GeneratorConfig;
use super::dictionary::Dictionary;
use super::gram::Gram;
use super::word::{Word, WordId};
use crate::error::ModelError;
use crate::io::{build_output_path, read_file};
use crate::parser;

/// Persisted form of a dictionary.
///
/// Probabilities are not stored: they are recomputed from the counts on load.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelDocument {
	pub n: usize,
	pub words: Vec<WordDocument>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WordDocument {
	pub id: WordId,
	pub input: String,
	pub output: String,
	pub gram: GramDocument,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GramDocument {
	pub word: WordId,
	pub count: u64,
	pub grams: Vec<GramDocument>,
}

impl From<&Gram> for GramDocument {
	fn from(gram: &Gram) -> Self {
		Self {
			word: gram.word(),
			count: gram.count(),
			grams: gram.children().map(GramDocument::from).collect(),
		}
	}
}

impl From<&Word> for WordDocument {
	fn from(word: &Word) -> Self {
		Self {
			id: word.id(),
			input: word.input().to_owned(),
			output: word.output().to_owned(),
			gram: GramDocument::from(word.gram()),
		}
	}
}

impl GramDocument {
	/// Builds the trie node, checking references and depth.
	fn build(&self, depth: usize, known: &BTreeSet<WordId>, owner: WordId, n: usize) -> Result<Gram, ModelError> {
		if !known.contains(&self.word) {
			return Err(ModelError::UnknownWordId(self.word));
		}
		if depth >= n {
			return Err(ModelError::TrieTooDeep { owner, n });
		}

		let mut grams = BTreeMap::new();
		for child in &self.grams {
			if grams.insert(child.word, child.build(depth + 1, known, owner, n)?).is_some() {
				return Err(ModelError::DuplicateGram { owner, word: child.word });
			}
		}
		Ok(Gram::restore(self.word, self.count, depth, grams))
	}
}

impl Dictionary {
	/// Snapshot of the dictionary in its persisted form.
	pub fn to_document(&self) -> ModelDocument {
		ModelDocument {
			n: self.n(),
			words: self.words().map(WordDocument::from).collect(),
		}
	}

	/// Rebuilds a dictionary from its persisted form.
	///
	/// Words are created first, then their tries are resolved against the
	/// full set of ids. Structural markers are paired by their input text and
	/// probabilities are recomputed.
	///
	/// # Notes
	/// - The order of `config` is replaced by the document's.
	///
	/// # Errors
	/// Returns an error on an invalid order, duplicate ids or input texts,
	/// references to unknown ids, siblings sharing a word, tries deeper than
	/// the order allows, or an id too large to leave room for new words.
	pub fn from_document(document: ModelDocument, mut config: GeneratorConfig) -> Result<Self, ModelError> {
		config.set_n(document.n)?;
		let n = document.n;

		// First pass: every id and input must be unique
		let mut known: BTreeSet<WordId> = BTreeSet::new();
		let mut index: HashMap<String, WordId> = HashMap::new();
		for word in &document.words {
			if !known.insert(word.id) {
				return Err(ModelError::DuplicateWordId(word.id));
			}
			if index.insert(word.input.clone(), word.id).is_some() {
				return Err(ModelError::DuplicateInput(word.input.clone()));
			}
		}

		// Second pass: tries may reference any word
		let mut words = BTreeMap::new();
		for word in document.words {
			if word.gram.word != word.id {
				return Err(ModelError::RootMismatch { owner: word.id, found: word.gram.word });
			}
			let gram = word.gram.build(0, &known, word.id, n)?;
			words.insert(word.id, Word::with_gram(word.id, word.input, word.output, gram));
		}

		let mut dictionary = Self::empty(config);
		dictionary.id_counter = match known.last() {
			Some(&max) => max.checked_add(1).ok_or(ModelError::IdSpaceExhausted(max))?,
			None => 0,
		};
		dictionary.words = words;
		dictionary.index = index;
		dictionary.pair_markers();
		dictionary.recompute_probabilities();
		Ok(dictionary)
	}

	/// Writes the dictionary as JSON to `path`.
	///
	/// The file is written next to its destination first and moved in place,
	/// so a failed save never leaves a truncated model behind.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
		let temp_file = temp_file_for(path.as_ref())?;
		{
			let mut writer = BufWriter::new(temp_file.as_file());
			serde_json::to_writer_pretty(&mut writer, &self.to_document())?;
			writer.flush()?;
		}
		temp_file.persist(path.as_ref()).map_err(|e| e.error)?;
		info!(path = %path.as_ref().display(), words = self.len(), "model saved");
		Ok(())
	}

	/// Loads a JSON model with default runtime settings.
	///
	/// # Errors
	/// Returns an error if the file cannot be read or the document is
	/// malformed. Nothing is modified on failure.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
		Self::load_with(path, GeneratorConfig::default())
	}

	/// Loads a JSON model, keeping the runtime settings of `config`.
	pub fn load_with<P: AsRef<Path>>(path: P, config: GeneratorConfig) -> Result<Self, ModelError> {
		let reader = BufReader::new(File::open(path.as_ref())?);
		// Every trie level nests two JSON values, so deep orders exceed the
		// default limit of 128
		let mut deserializer = serde_json::Deserializer::from_reader(reader);
		deserializer.disable_recursion_limit();
		let document = ModelDocument::deserialize(&mut deserializer)?;
		deserializer.end()?;
		let dictionary = Self::from_document(document, config)?;
		info!(path = %path.as_ref().display(), words = dictionary.len(), "model loaded");
		Ok(dictionary)
	}

	/// Writes a compact binary snapshot to `path`.
	pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
		let bytes = postcard::to_stdvec(&self.to_document())?;
		let mut temp_file = temp_file_for(path.as_ref())?;
		temp_file.write_all(&bytes)?;
		temp_file.persist(path.as_ref()).map_err(|e| e.error)?;
		Ok(())
	}

	/// Loads a binary snapshot written by `save_snapshot`.
	pub fn load_snapshot<P: AsRef<Path>>(path: P, config: GeneratorConfig) -> Result<Self, ModelError> {
		let bytes = fs::read(path)?;
		let document: ModelDocument = postcard::from_bytes(&bytes)?;
		Self::from_document(document, config)
	}

	/// Builds a dictionary from a text corpus, using its binary snapshot when
	/// one exists.
	///
	/// - `data/input.txt` is cached as `data/input.bin`.
	/// - A snapshot of a different order than `config` is ignored and rebuilt.
	/// - Lines are tokenized in parallel and ingested one chunk at a time.
	pub fn from_corpus<P: AsRef<Path>>(filepath: P, config: GeneratorConfig) -> Result<Self, ModelError> {
		let snapshot_path = build_output_path(&filepath, "bin")?;
		if snapshot_path.exists() {
			let dictionary = Self::load_snapshot(&snapshot_path, config.clone())?;
			if dictionary.n() == config.n() {
				info!(path = %snapshot_path.display(), "snapshot loaded");
				return Ok(dictionary);
			}
			info!(path = %snapshot_path.display(), "snapshot order differs, rebuilding");
		}

		let lines = read_file(&filepath)?;
		info!(path = %filepath.as_ref().display(), lines = lines.len(), "ingesting corpus");

		let mut dictionary = Self::new(config);
		let mut sentences = 0;
		for tokens in parser::parse_lines_parallel(lines) {
			sentences += dictionary.ingest(tokens.as_slice());
		}
		dictionary.recompute_probabilities();
		info!(sentences, words = dictionary.len(), "corpus ingested");

		dictionary.save_snapshot(&snapshot_path)?;
		Ok(dictionary)
	}
}

/// Temporary file in the directory of `path`, created if needed.
fn temp_file_for(path: &Path) -> Result<NamedTempFile, ModelError> {
	let parent = path
		.parent()
		.filter(|parent| !parent.as_os_str().is_empty())
		.unwrap_or_else(|| Path::new("."));
	fs::create_dir_all(parent)?;
	Ok(NamedTempFile::new_in(parent)?)
}
