//! Sentence-greedy chunking of cleaned document text.
//!
//! Text is split after `.`, `?` or `!` followed by whitespace, then sentences are packed
//! into chunks of at most `max_chars` characters. A sentence longer than `max_chars` is
//! never split; it becomes its own oversized chunk. Sizes are characters, not tokens.

use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("valid sentence boundary pattern"));

/// Split `text` into sentences, keeping the terminating punctuation.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BOUNDARY.find_iter(text) {
        // the punctuation mark is a single ASCII byte
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    sentences.push(&text[start..]);
    sentences.retain(|s| !s.trim().is_empty());
    sentences
}

/// Greedily pack sentences into chunks of at most `max_chars` characters.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();
        if buffer_chars + sentence_chars > max_chars && !buffer.trim().is_empty() {
            chunks.push(buffer.trim().to_string());
            buffer.clear();
            buffer_chars = 0;
        }
        buffer.push_str(sentence);
        buffer.push(' ');
        buffer_chars += sentence_chars + 1;
    }

    if !buffer.trim().is_empty() {
        chunks.push(buffer.trim().to_string());
    }
    chunks
}
