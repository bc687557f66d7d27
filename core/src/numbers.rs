//! Pluggable number-to-words engine used to expand `RangeSlotList`s.
//!
//! `core::compile` depends on the [`NumberEngine`] trait rather than the
//! `num2words` crate directly, mirroring the original system's
//! engine-present / engine-absent code paths for range expansion.
use std::cell::RefCell;
use std::collections::HashMap;

use num2words::{Lang, Num2Words};

/// Produces the distinct textual renderings of an integer available from
/// whatever rulesets the underlying engine supports.
pub trait NumberEngine {
    /// All distinct spoken renderings of `n`, dash-joined compounds
    /// normalised to spaces (`"twenty-one"` -> `"twenty one"`).
    fn renderings(&self, n: i64) -> Vec<String>;
}

/// [`NumberEngine`] backed by the `num2words` crate for a single language.
pub struct Num2WordsEngine {
    lang: Lang,
}

impl Num2WordsEngine {
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }

    pub fn english() -> Self {
        Self::new(Lang::English)
    }
}

impl NumberEngine for Num2WordsEngine {
    fn renderings(&self, n: i64) -> Vec<String> {
        match Num2Words::new(n).lang(self.lang.clone()).to_words() {
            Ok(words) => vec![words.replace('-', " ")],
            Err(_) => Vec::new(),
        }
    }
}

/// One expanded range value: the literal decimal string (carried as the
/// arc's output so the numeric token reconstructs) paired with one spoken
/// rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberRendering {
    pub decimal: String,
    pub spoken: String,
}

/// Memoises `(start, stop_exclusive, step)` range expansions so repeated
/// `{number}` list references in one grammar only hit the engine once.
#[derive(Default)]
pub struct NumberRangeCache {
    cache: RefCell<HashMap<(i64, i64, i64), Vec<NumberRendering>>>,
}

impl NumberRangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand `start..=stop` by `step` into `(decimal, spoken)` pairs using
    /// `engine`, memoised by `(start, stop + 1, step)`. Empty when `engine`
    /// is `None` and the range itself is non-empty (a dead branch upstream,
    /// unless the caller opts into decimal fallback separately).
    pub fn expand(
        &self,
        engine: Option<&dyn NumberEngine>,
        start: i64,
        stop: i64,
        step: i64,
    ) -> Vec<NumberRendering> {
        let key = (start, stop + 1, step);
        if let Some(hit) = self.cache.borrow().get(&key) {
            return hit.clone();
        }

        let mut values = Vec::new();
        if let Some(engine) = engine {
            let mut n = start;
            while n <= stop {
                let decimal = n.to_string();
                for spoken in engine.renderings(n) {
                    values.push(NumberRendering {
                        decimal: decimal.clone(),
                        spoken,
                    });
                }
                n += step;
            }
        }

        self.cache.borrow_mut().insert(key, values.clone());
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEngine;
    impl NumberEngine for StubEngine {
        fn renderings(&self, n: i64) -> Vec<String> {
            vec![format!("number-{n}")]
        }
    }

    #[test]
    fn expand_memoises_by_range_key() {
        let cache = NumberRangeCache::new();
        let engine = StubEngine;
        let first = cache.expand(Some(&engine), 1, 3, 1);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].decimal, "1");
        assert_eq!(first[0].spoken, "number 1");

        // Calling again with a *different* stub would still return the
        // cached values, proving memoisation by key rather than by engine.
        let second = cache.expand(Some(&engine), 1, 3, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn expand_without_engine_is_empty() {
        let cache = NumberRangeCache::new();
        let values = cache.expand(None, 1, 3, 1);
        assert!(values.is_empty());
    }

    #[test]
    fn num2words_engine_normalises_dashes_to_spaces() {
        let engine = Num2WordsEngine::english();
        let renderings = engine.renderings(21);
        assert!(renderings.iter().all(|r| !r.contains('-')));
    }
}
