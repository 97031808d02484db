use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
	"a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
	"being", "between", "but", "by", "can", "could", "do", "does", "during", "for", "from", "had",
	"has", "have", "how", "if", "in", "into", "is", "it", "its", "me", "more", "most", "my", "no",
	"not", "of", "on", "or", "other", "our", "over", "show", "should", "some", "such", "than",
	"that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "through",
	"to", "under", "up", "us", "using", "very", "was", "we", "were", "what", "when", "where",
	"which", "while", "who", "why", "will", "with", "within", "without", "would", "you", "your",
	"article", "articles", "find", "information", "latest", "paper", "papers", "publication",
	"publications", "research", "studies", "study", "vs", "versus",
];

/// NFKC-folds, lower-cases and splits on Unicode word boundaries; punctuation inside words
/// is dropped, so "Crohn's" and "crohns" compare equal. Words are joined by single spaces.
pub fn normalize_text(text: &str) -> String {
	let folded: String = text.nfkc().collect();
	let mut out = String::with_capacity(folded.len());

	for word in folded.unicode_words() {
		let mut cleaned = String::with_capacity(word.len());

		for ch in word.chars() {
			if ch.is_alphanumeric() {
				cleaned.extend(ch.to_lowercase());
			}
		}

		if cleaned.is_empty() {
			continue;
		}
		if !out.is_empty() {
			out.push(' ');
		}

		out.push_str(&cleaned);
	}

	out
}

pub fn is_stop_word(token: &str) -> bool {
	STOP_WORDS.contains(&token)
}

/// Byte offsets of every whole-word occurrence of `needle` in `haystack`. Both sides must
/// already be normalized with [`normalize_text`].
pub fn word_positions(haystack: &str, needle: &str) -> Vec<usize> {
	if needle.is_empty() || haystack.len() < needle.len() {
		return Vec::new();
	}

	let bytes = haystack.as_bytes();
	let mut out = Vec::new();
	let mut from = 0;

	// Advance one char at a time so overlapping occurrences are all seen.
	while let Some(offset) = haystack[from..].find(needle) {
		let start = from + offset;
		let end = start + needle.len();
		let left_ok = start == 0 || bytes[start - 1] == b' ';
		let right_ok = end == bytes.len() || bytes[end] == b' ';

		if left_ok && right_ok {
			out.push(start);
		}

		from = start + haystack[start..].chars().next().map(char::len_utf8).unwrap_or(1);
	}

	out
}

pub fn contains_word(haystack: &str, needle: &str) -> bool {
	!word_positions(haystack, needle).is_empty()
}

/// Appends `value` if it is non-empty and not already present.
pub fn push_unique(out: &mut Vec<String>, value: &str) {
	let trimmed = value.trim();

	if trimmed.is_empty() || out.iter().any(|existing| existing == trimmed) {
		return;
	}

	out.push(trimmed.to_string());
}
