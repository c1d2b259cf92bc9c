use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads a text corpus and returns its non-blank lines.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let contents = fs::read_to_string(filename)?;
	Ok(contents
		.lines()
		.filter(|line| !line.trim().is_empty())
		.map(str::to_owned)
		.collect())
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/input.txt` + `"bin"` → `data/input.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(input_path: P, output_extension: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Path of the model called `name` inside `dir`.
///
/// Rejects names that would escape `dir` (separators, `..`, empty).
///
/// Example:
/// `"data"`, `"french"`, `"json"` → `data/french.json`
pub fn model_path<P: AsRef<Path>>(dir: P, name: &str, extension: &str) -> io::Result<PathBuf> {
	let name = name.trim();
	if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid model name {name:?}")));
	}
	let mut path = dir.as_ref().join(name);
	path.set_extension(extension);
	Ok(path)
}

/// Lists the names (file stems) of files with a given extension in a
/// directory, sorted.
pub fn list_models<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut names = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(stem) = path.file_stem() {
				names.push(stem.to_string_lossy().to_string());
			}
		}
	}

	names.sort();
	Ok(names)
}
