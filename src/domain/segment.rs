//! Phrase-table segmentation.
//!
//! Text is split into words and gaps. Runs of words joined only by
//! whitespace are matched greedily, longest first, against a lookup
//! function. Unmatched words pass through untouched and gaps are kept,
//! except for whitespace between two translated pieces when the target
//! script is written without spaces.

use once_cell::sync::Lazy;
use std::collections::HashSet;

pub const DEFAULT_MAX_PHRASE_WORDS: usize = 6;

static UNSPACED_LANGUAGES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["zh", "zt", "ja", "th", "lo", "my", "km"].into_iter().collect());

/// Whether `code` names a language written without spaces between words.
pub fn is_unspaced(code: &str) -> bool {
    UNSPACED_LANGUAGES.contains(code)
}

/// Lookup key form: lowercase, single spaces, trimmed.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    text: &'a str,
    word: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\''
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (idx, c) in text.char_indices() {
        let word = is_word_char(c);
        match current {
            Some(kind) if kind == word => {}
            Some(kind) => {
                tokens.push(Token {
                    text: &text[start..idx],
                    word: kind,
                });
                start = idx;
                current = Some(word);
            }
            None => current = Some(word),
        }
    }
    if let Some(kind) = current {
        tokens.push(Token {
            text: &text[start..],
            word: kind,
        });
    }
    tokens
}

enum Piece<'a> {
    Translated(String),
    Source(&'a str),
    Gap(&'a str),
}

/// Translate `text` using `lookup` on normalized phrase keys.
pub fn translate_with<F, E>(
    text: &str,
    max_words: usize,
    unspaced: bool,
    mut lookup: F,
) -> Result<String, E>
where
    F: FnMut(&str) -> Result<Option<String>, E>,
{
    let whole = normalize(text);
    if whole.is_empty() {
        return Ok(text.to_string());
    }
    if let Some(hit) = lookup(&whole)? {
        return Ok(hit);
    }

    let max_words = max_words.max(1);
    let tokens = tokenize(text);
    let mut pieces = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        if !token.word {
            pieces.push(Piece::Gap(token.text));
            i += 1;
            continue;
        }

        // Word token positions reachable through whitespace-only gaps.
        let mut span = vec![i];
        let mut j = i;
        while span.len() < max_words && j + 2 < tokens.len() {
            let gap = tokens[j + 1];
            if !gap.text.chars().all(char::is_whitespace) {
                break;
            }
            j += 2;
            span.push(j);
        }

        let mut matched = None;
        for n in (1..=span.len()).rev() {
            let key = span[..n]
                .iter()
                .map(|&k| tokens[k].text.to_lowercase())
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(hit) = lookup(&key)? {
                matched = Some((hit, span[n - 1]));
                break;
            }
        }

        match matched {
            Some((hit, last)) => {
                pieces.push(Piece::Translated(hit));
                i = last + 1;
            }
            None => {
                pieces.push(Piece::Source(token.text));
                i += 1;
            }
        }
    }

    Ok(join(&pieces, unspaced))
}

fn join(pieces: &[Piece<'_>], unspaced: bool) -> String {
    let mut out = String::new();
    for (idx, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Translated(text) => out.push_str(text),
            Piece::Source(text) => out.push_str(text),
            Piece::Gap(text) => {
                let between_translations = idx > 0
                    && matches!(pieces[idx - 1], Piece::Translated(_))
                    && matches!(pieces.get(idx + 1), Some(Piece::Translated(_)));
                if unspaced && between_translations && text.chars().all(char::is_whitespace) {
                    continue;
                }
                out.push_str(text);
            }
        }
    }
    out
}
