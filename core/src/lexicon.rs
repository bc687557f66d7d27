//! Pronunciation lexicon lookup and the surface-word splitting routine.
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::numbers::NumberEngine;

/// NFC-normalize and trim a raw surface token before lookup/classification,
/// matching the teacher's own `utils::normalize`.
fn normalize(s: &str) -> String {
    s.nfc().collect::<String>().trim().to_string()
}

/// One resolved sub-word: its surface form for the input label, and its
/// output label when unsuppressed. `output: None` means this sub-word must
/// carry no output at all (a continuation word of a multi-word number
/// expansion, whose leading word already carried the numeric output) — it
/// is NOT a "default to surface" marker, since plain words explicitly
/// carry `Some(surface)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitWord {
    pub surface: String,
    pub output: Option<String>,
}

impl SplitWord {
    pub fn plain(surface: impl Into<String>) -> Self {
        let surface = surface.into();
        Self {
            output: Some(surface.clone()),
            surface,
        }
    }
}

/// Known-pronunciation word store. A word "exists" if any case variation of
/// it (original, lowercase, casefold-equivalent via lowercase, uppercase)
/// has at least one registered pronunciation.
#[derive(Default)]
pub struct LexiconDatabase {
    // Real deployments back this with a SQLite/flat-file pronunciation
    // store; the in-memory cache is the only part this compiler needs.
    words: RwLock<HashSet<String>>,
}

impl LexiconDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, word: impl Into<String>) {
        self.words.write().unwrap().insert(normalize(&word.into()));
    }

    fn word_variations(word: &str) -> Vec<String> {
        let word = normalize(word);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |w: String| {
            if seen.insert(w.clone()) {
                out.push(w);
            }
        };
        push(word.clone());
        push(word.to_lowercase());
        // Rust has no distinct `casefold`; lowercase approximates CPython's
        // `str.casefold()` closely enough for the ASCII-heavy lexicon this
        // targets, and `word_variations` already dedups repeats.
        push(word.to_uppercase());
        out
    }

    pub fn exists(&self, word: &str) -> bool {
        let words = self.words.read().unwrap();
        Self::word_variations(word).iter().any(|w| words.contains(w))
    }
}

struct SplitPatterns {
    number_split: Regex,
    initialism_no_dots: Regex,
    initialism_dots: Regex,
    number: Regex,
}

impl SplitPatterns {
    fn new() -> Self {
        Self {
            number_split: Regex::new(r"(\d+(?:\.\d+)?)").unwrap(),
            initialism_no_dots: Regex::new(r"^[A-Z]{2,}$").unwrap(),
            initialism_dots: Regex::new(r"^(?:[A-Za-z]\.){2,}$").unwrap(),
            number: Regex::new(r"^\d+(?:\.\d+)?$").unwrap(),
        }
    }
}

fn split_on_numbers<'a>(patterns: &SplitPatterns, token: &'a str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in patterns.number_split.find_iter(token) {
        if m.start() > last {
            parts.push(&token[last..m.start()]);
        }
        parts.push(m.as_str());
        last = m.end();
    }
    if last < token.len() {
        parts.push(&token[last..]);
    }
    parts
}

/// Split one raw whitespace-delimited token into `(surface, output?)`
/// sub-words per the lexicon/initialism/number classification rules.
pub fn split_word(
    token: &str,
    lexicon: &LexiconDatabase,
    number_engine: Option<&dyn NumberEngine>,
) -> Vec<SplitWord> {
    let token = &normalize(token);
    if lexicon.exists(token) {
        return vec![SplitWord::plain(token.as_str())];
    }

    let patterns = SplitPatterns::new();
    let mut out = Vec::new();
    for sub_word in split_on_numbers(&patterns, token) {
        if sub_word.is_empty() {
            continue;
        }
        if lexicon.exists(sub_word) {
            out.push(SplitWord::plain(sub_word));
        } else if patterns.initialism_no_dots.is_match(sub_word) {
            out.extend(sub_word.chars().map(|c| SplitWord::plain(c.to_string())));
        } else if patterns.initialism_dots.is_match(sub_word) {
            out.extend(
                sub_word
                    .chars()
                    .filter(|c| *c != '.')
                    .map(|c| SplitWord::plain(c.to_string())),
            );
        } else if patterns.number.is_match(sub_word) {
            if let Some(engine) = number_engine {
                if let Ok(n) = sub_word.parse::<i64>() {
                    let renderings = engine.renderings(n);
                    if let Some(first) = renderings.first() {
                        let number_words: Vec<&str> = first.split_whitespace().collect();
                        for (idx, word) in number_words.iter().enumerate() {
                            if idx == 0 {
                                out.push(SplitWord {
                                    surface: word.to_string(),
                                    output: Some(sub_word.to_string()),
                                });
                            } else {
                                out.push(SplitWord {
                                    surface: word.to_string(),
                                    output: None,
                                });
                            }
                        }
                        continue;
                    }
                }
            }
            // No engine, or the sub-word wasn't a plain integer (decimal
            // point present): keep it as a guess.
            out.push(SplitWord::plain(sub_word));
        } else {
            out.push(SplitWord::plain(sub_word));
        }
    }
    out
}

/// Lightweight cache mapping a raw token to its pre-computed split, used by
/// `core::compile` to avoid re-splitting the same literal text repeatedly
/// across a large grammar.
#[derive(Default)]
pub struct SplitCache {
    cache: RwLock<HashMap<String, Vec<SplitWord>>>,
}

impl SplitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_split(
        &self,
        token: &str,
        lexicon: &LexiconDatabase,
        number_engine: Option<&dyn NumberEngine>,
    ) -> Vec<SplitWord> {
        if let Some(hit) = self.cache.read().unwrap().get(token) {
            return hit.clone();
        }
        let split = split_word(token, lexicon, number_engine);
        self.cache
            .write()
            .unwrap()
            .insert(token.to_string(), split.clone());
        split
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEngine;
    impl NumberEngine for StubEngine {
        fn renderings(&self, n: i64) -> Vec<String> {
            match n {
                100 => vec!["one hundred".to_string()],
                _ => vec![format!("number-{n}")],
            }
        }
    }

    #[test]
    fn exists_matches_any_case_variation() {
        let lex = LexiconDatabase::new();
        lex.add("Light");
        assert!(lex.exists("light"));
        assert!(lex.exists("LIGHT"));
        assert!(lex.exists("Light"));
        assert!(!lex.exists("lamp"));
    }

    #[test]
    fn split_word_keeps_known_words_whole() {
        let lex = LexiconDatabase::new();
        lex.add("kitchen");
        let result = split_word("kitchen", &lex, None);
        assert_eq!(result, vec![SplitWord::plain("kitchen")]);
    }

    #[test]
    fn split_word_separates_alpha_and_numeric_runs() {
        let lex = LexiconDatabase::new();
        let result = split_word("abc123", &lex, None);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].surface, "abc");
        assert_eq!(result[1].surface, "123");
    }

    #[test]
    fn split_word_spells_out_initialism_no_dots() {
        let lex = LexiconDatabase::new();
        let result = split_word("ABC", &lex, None);
        assert_eq!(
            result,
            vec![
                SplitWord::plain("A"),
                SplitWord::plain("B"),
                SplitWord::plain("C"),
            ]
        );
    }

    #[test]
    fn split_word_spells_out_initialism_with_dots() {
        let lex = LexiconDatabase::new();
        let result = split_word("A.B.C.", &lex, None);
        assert_eq!(
            result,
            vec![
                SplitWord::plain("A"),
                SplitWord::plain("B"),
                SplitWord::plain("C"),
            ]
        );
    }

    #[test]
    fn split_word_expands_number_with_engine_carrying_output_on_first_word() {
        let lex = LexiconDatabase::new();
        let engine = StubEngine;
        let result = split_word("100", &lex, Some(&engine));
        assert_eq!(
            result,
            vec![
                SplitWord {
                    surface: "one".to_string(),
                    output: Some("100".to_string()),
                },
                SplitWord {
                    surface: "hundred".to_string(),
                    output: None,
                },
            ]
        );
    }

    #[test]
    fn split_word_keeps_number_as_guess_without_engine() {
        let lex = LexiconDatabase::new();
        let result = split_word("42", &lex, None);
        assert_eq!(result, vec![SplitWord::plain("42")]);
    }

    #[test]
    fn exists_normalizes_decomposed_unicode_before_lookup() {
        let lex = LexiconDatabase::new();
        // "cafe\u{0301}" (combining acute accent) is the NFD form of "café".
        lex.add("cafe\u{0301}");
        assert!(lex.exists("caf\u{e9}"));
    }

    #[test]
    fn split_word_trims_surrounding_whitespace() {
        let lex = LexiconDatabase::new();
        lex.add("kitchen");
        let result = split_word("  kitchen  ", &lex, None);
        assert_eq!(result, vec![SplitWord::plain("kitchen")]);
    }

    #[test]
    fn split_cache_reuses_previous_split_for_same_token() {
        let lex = LexiconDatabase::new();
        let cache = SplitCache::new();
        let first = cache.get_or_split("abc123", &lex, None);
        let second = cache.get_or_split("abc123", &lex, None);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
