use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::caption::normalize::capitalize_first;

/// Sentences shorter than this are fragments left over from cleaning.
const MIN_SENTENCE_CHARS: usize = 10;
/// Word-overlap ratio above which two sentences count as the same sentence.
pub const DUPLICATE_SIMILARITY: f64 = 0.8;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,!?])").unwrap());
static TERMINAL_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!](?:\s*[.!])+").unwrap());
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!]\s+").unwrap());

fn word_set(sentence: &str) -> HashSet<String> {
    sentence
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect()
}

/// `|A ∩ B| / max(|A|, |B|)`; 0 when either set is empty.
fn set_overlap(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(right).count();
    shared as f64 / left.len().max(right.len()) as f64
}

/// Each run of terminal marks keeps only its first mark.
fn normalize_punctuation(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = text.replace('?', ".");
    let text = SPACE_BEFORE_PUNCTUATION.replace_all(&text, "$1");
    let text = TERMINAL_RUN.replace_all(&text, |caps: &Captures| caps[0][..1].to_string());
    text.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sentence<'a> {
    body: &'a str,
    terminal: char,
}

impl<'a> Sentence<'a> {
    fn parse(piece: &'a str) -> Self {
        let piece = piece.trim();
        let terminal = if piece.ends_with('!') { '!' } else { '.' };
        Self {
            body: piece.trim_end_matches(['.', '!']).trim_end(),
            terminal,
        }
    }
}

fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for found in SENTENCE_BREAK.find_iter(text) {
        sentences.push(Sentence::parse(&text[start..found.end()]));
        start = found.end();
    }
    sentences.push(Sentence::parse(&text[start..]));
    sentences
}

/// Keeps the first of every group of near-identical sentences.
fn dedupe(sentences: Vec<Sentence<'_>>) -> Vec<Sentence<'_>> {
    let mut kept: Vec<(Sentence<'_>, HashSet<String>)> = Vec::new();
    for sentence in sentences {
        let words = word_set(sentence.body);
        if words.is_empty() {
            continue;
        }
        let duplicate = kept
            .iter()
            .any(|(_, seen)| set_overlap(&words, seen) > DUPLICATE_SIMILARITY);
        if !duplicate {
            kept.push((sentence, words));
        }
    }
    kept.into_iter().map(|(sentence, _)| sentence).collect()
}

/// Final pass over an assembled paragraph: drops fragments and repeated
/// sentences, then re-punctuates. Every sentence keeps its own `!` or `.`.
/// Polishing a polished paragraph is a no-op.
pub fn polish(text: &str) -> String {
    let normalized = normalize_punctuation(text);
    let candidates = split_sentences(&normalized)
        .into_iter()
        .filter(|sentence| sentence.body.chars().count() >= MIN_SENTENCE_CHARS)
        .collect();

    dedupe(candidates)
        .into_iter()
        .map(|sentence| format!("{}{}", capitalize_first(sentence.body), sentence.terminal))
        .collect::<Vec<_>>()
        .join(" ")
}
