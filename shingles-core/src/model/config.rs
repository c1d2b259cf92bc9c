use crate::error::ModelError;

/// Rule used by ingestion to cut a token stream into sentences.
///
/// # Variants
/// - `TopLevel`: `.`, `!` and `?` end a sentence only when no quote or
///   parenthesis is open.
/// - `Eager`: they end a sentence at any depth; open markers are closed
///   synthetically before the sentence is indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Segmentation {
	#[default]
	TopLevel,
	Eager,
}

/// Settings of a `Dictionary`.
///
/// Only the order `n` is part of the persisted model; everything else is a
/// runtime knob for ingestion and generation.
///
/// # Invariants
/// - `n >= 1`
/// - `sentence_cap >= 1`
/// - `max_steps >= 1`
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
	/// Order of the model (maximum number of tokens in a gram).
	n: usize,

	/// Sentence length after which generation tries to close open markers.
	sentence_cap: usize,

	/// Upper bound on extension attempts for a single generation.
	max_steps: usize,

	/// Sentence splitting rule applied during ingestion.
	pub segmentation: Segmentation,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			n: 3,
			sentence_cap: 10,
			max_steps: 10_000,
			segmentation: Segmentation::TopLevel,
		}
	}
}

impl GeneratorConfig {
	/// Creates a configuration of order `n` with default runtime settings.
	///
	/// # Errors
	/// Returns an error if `n == 0`.
	pub fn new(n: usize) -> Result<Self, ModelError> {
		let mut config = Self::default();
		config.set_n(n)?;
		Ok(config)
	}

	pub fn n(&self) -> usize {
		self.n
	}

	pub fn sentence_cap(&self) -> usize {
		self.sentence_cap
	}

	pub fn max_steps(&self) -> usize {
		self.max_steps
	}

	/// Sets the order of the model.
	///
	/// # Errors
	/// Returns an error if `n == 0`.
	pub fn set_n(&mut self, n: usize) -> Result<(), ModelError> {
		if n == 0 {
			return Err(ModelError::InvalidOrder(n));
		}
		self.n = n;
		Ok(())
	}

	/// Sets the sentence length that switches generation to finish mode.
	///
	/// # Errors
	/// Returns an error if `sentence_cap == 0`.
	pub fn set_sentence_cap(&mut self, sentence_cap: usize) -> Result<(), ModelError> {
		if sentence_cap == 0 {
			return Err(ModelError::InvalidConfig("sentence cap must be >= 1".to_owned()));
		}
		self.sentence_cap = sentence_cap;
		Ok(())
	}

	/// Sets the maximum number of extension attempts per generation.
	///
	/// # Errors
	/// Returns an error if `max_steps == 0`.
	pub fn set_max_steps(&mut self, max_steps: usize) -> Result<(), ModelError> {
		if max_steps == 0 {
			return Err(ModelError::InvalidConfig("max steps must be >= 1".to_owned()));
		}
		self.max_steps = max_steps;
		Ok(())
	}

	/// Number of context tokens looked at when predicting the next one.
	///
	/// Order 1 still consults the last token so the window is never empty.
	pub(crate) fn context_len(&self) -> usize {
		self.n.saturating_sub(1).max(1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_zero_values() {
		assert!(matches!(GeneratorConfig::new(0), Err(ModelError::InvalidOrder(0))));

		let mut config = GeneratorConfig::default();
		assert!(config.set_sentence_cap(0).is_err());
		assert!(config.set_max_steps(0).is_err());
		assert_eq!(config.sentence_cap(), 10);
		assert_eq!(config.max_steps(), 10_000);
	}

	#[test]
	fn context_len_is_never_empty() {
		assert_eq!(GeneratorConfig::new(1).unwrap().context_len(), 1);
		assert_eq!(GeneratorConfig::new(2).unwrap().context_len(), 1);
		assert_eq!(GeneratorConfig::new(4).unwrap().context_len(), 3);
	}
}
