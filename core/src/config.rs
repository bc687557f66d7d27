//! Tunable constants for compilation, space-removal and fuzzy decoding.
use serde::{Deserialize, Serialize};

/// Configuration for the compiler and fuzzy resolver.
///
/// Every field here is a named constant in the source system; exposing them
/// as a serializable config (rather than literals scattered through the
/// code) lets a caller tune decoding behavior per-deployment without
/// recompiling.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Penalty added to a whole-word arc during space-removal, in
    /// negative-log-probability units. Breaks ties in favor of shorter
    /// matching hypotheses. Default: 0.03.
    pub word_penalty: f32,

    /// Per-rank penalty applied to N-best hypotheses before fuzzy
    /// composition (`k * nbest_penalty` for the k-th ranked hypothesis,
    /// 0-based). Default: 0.1.
    pub nbest_penalty: f32,

    /// Cost above which a resolved fuzzy path is rejected as out-of-grammar.
    /// Default: 2.0.
    pub max_fuzzy_cost: f32,

    /// Cost charged by the fuzzy FST's self-loop for discarding one grammar
    /// word. Default: 1.0.
    pub fuzzy_delete_cost: f32,

    /// Cost charged by the fuzzy FST's free epsilon self-loop. Default: 0.0.
    pub fuzzy_epsilon_cost: f32,

    /// When a `RangeSlotList` has no number engine available, fall back to
    /// the literal decimal string as a single spoken alternative instead of
    /// treating the list as a dead branch.
    pub range_fallback_to_decimal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            word_penalty: 0.03,
            nbest_penalty: 0.1,
            max_fuzzy_cost: 2.0,
            fuzzy_delete_cost: 1.0,
            fuzzy_epsilon_cost: 0.0,
            range_fallback_to_decimal: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.word_penalty, 0.03);
        assert_eq!(cfg.nbest_penalty, 0.1);
        assert_eq!(cfg.max_fuzzy_cost, 2.0);
    }

    #[test]
    fn roundtrips_through_toml() {
        let cfg = Config::default();
        let s = cfg.to_toml_string().unwrap();
        let back = Config::from_toml_str(&s).unwrap();
        assert_eq!(cfg, back);
    }
}
