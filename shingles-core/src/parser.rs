//! Text to token conversion.
//!
//! Produces the lowercase token streams `Dictionary::ingest` consumes, with
//! quoted and bracketed spans already wrapped in `<q>`/`</q>` and `<p>`/`</p>`
//! and punctuation split into standalone tokens.

use std::sync::LazyLock;
use std::sync::mpsc;
use std::thread;

use regex::Regex;

static CONTROL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\x00-\x1F]").expect("valid regex"));
static PUNCTUATION: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"([.,:;!?()\[\]{}"'“”‘’«»…])"#).expect("valid regex"));
static ANGLED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(.+?)>").expect("valid regex"));
static ANGLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>]").expect("valid regex"));
static QUOTES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
	[r#""(.+?)""#, r"“(.+?)”", r"‘(.+?)’", r"«(.+?)»"].map(|pattern| Regex::new(pattern).expect("valid regex"))
});
static PARENS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
	[r"\((.+?)\)", r"\[(.+?)\]", r"\{(.+?)\}"].map(|pattern| Regex::new(pattern).expect("valid regex"))
});
static STRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["“”‘’«»()\[\]{}]"#).expect("valid regex"));

/// Splits raw text into lowercase tokens.
///
/// Quotes and brackets that do not pair up are dropped; anything that looks
/// like a marker in the input is turned into a parenthesis first so the
/// only markers in the output are the ones inserted here.
pub fn parse(text: &str) -> Vec<String> {
	let text = CONTROL.replace_all(text, " ");
	let text = text.replace("...", "…");
	let text = PUNCTUATION.replace_all(&text, " $1 ");

	let text = ANGLED.replace_all(&text, "($1)");
	let mut text = ANGLE.replace_all(&text, " ").into_owned();

	for quote in QUOTES.iter() {
		text = quote.replace_all(&text, " <q> $1 </q> ").into_owned();
	}
	for paren in PARENS.iter() {
		text = paren.replace_all(&text, " <p> $1 </p> ").into_owned();
	}
	let text = STRAY.replace_all(&text, " ");

	text.to_lowercase().split_whitespace().map(str::to_owned).collect()
}

/// Tokenizes lines on worker threads.
///
/// # Behavior
/// - Splits lines into `cpus * 8` chunks.
/// - Spawns one thread per chunk; each parses its lines independently.
/// - Returns one token list per chunk, in completion order.
///
/// # Notes
/// - Chunks share nothing, so the order they finish in does not matter for
///   parsing; feeding them to a dictionary must still happen one at a time.
pub fn parse_lines_parallel(lines: Vec<String>) -> Vec<Vec<String>> {
	if lines.is_empty() {
		return Vec::new();
	}

	let cpus = num_cpus::get();
	let factor = 8;
	let chunks = cpus * factor;
	let chunk_size = lines.len().div_ceil(chunks).max(1);

	let (tx, rx) = mpsc::channel();
	for chunk in lines.chunks(chunk_size) {
		let tx = tx.clone();
		let chunk: Vec<String> = chunk.to_vec();

		thread::spawn(move || {
			let tokens: Vec<String> = chunk.iter().flat_map(|line| parse(line)).collect();
			// The receiver lives until every sender is gone
			let _ = tx.send(tokens);
		});
	}
	drop(tx);

	rx.iter().collect()
}
