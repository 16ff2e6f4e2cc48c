use std::collections::HashSet;

/// Character-safe prefix of at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((byte_idx, _)) => &text[..byte_idx],
		None => text,
	}
}

pub fn excerpt(content: &str, max_chars: usize) -> String {
	truncate_chars(content, max_chars).to_string()
}

/// Parses a comma-separated form value such as `"Ada Lovelace, Alan Turing"`.
pub fn parse_list(raw: &str) -> Vec<String> {
	clean_list(raw.split(','))
}

/// Trims entries, drops blanks, and removes exact duplicates while keeping first occurrences.
pub fn clean_list<I, S>(items: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for item in items {
		let trimmed = item.as_ref().trim();

		if trimmed.is_empty() {
			continue;
		}
		if seen.insert(trimmed.to_string()) {
			out.push(trimmed.to_string());
		}
	}

	out
}

/// Trims entries and drops blanks. Order and repeated entries are kept, so an author list comes
/// back as supplied.
pub fn clean_names<I, S>(items: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	items
		.into_iter()
		.map(|item| item.as_ref().trim().to_string())
		.filter(|item| !item.is_empty())
		.collect()
}
