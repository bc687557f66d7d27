//! Scope-aware lookup of named lists/rules, and context filtering of slot values.
use std::collections::HashMap;

use crate::expression::Expression;
use crate::intents::{ContextValue, IntentData, Intents, SlotList};

/// Look up a slot list by name with precedence: explicit caller-supplied map
/// -> `IntentData.slot_lists` -> `Intents.slot_lists`.
pub fn lookup_slot_list<'a>(
    name: &str,
    caller_lists: Option<&'a HashMap<String, SlotList>>,
    intent_data: &'a IntentData,
    intents: &'a Intents,
) -> Option<&'a SlotList> {
    caller_lists
        .and_then(|m| m.get(name))
        .or_else(|| intent_data.slot_lists.get(name))
        .or_else(|| intents.slot_lists.get(name))
}

/// Look up an expansion rule by name with precedence: `IntentData.expansion_rules`
/// -> `Intents.expansion_rules`. Unresolved rules are a fatal compile error
/// (see [`crate::error::CompileError::UnknownRule`]).
pub fn lookup_expansion_rule<'a>(
    name: &str,
    intent_data: &'a IntentData,
    intents: &'a Intents,
) -> Option<&'a Expression> {
    intent_data
        .expansion_rules
        .get(name)
        .or_else(|| intents.expansion_rules.get(name))
}

/// True if `value_context` (a slot value's own context, possibly absent)
/// satisfies every key in `requires`. A key missing from `value_context` is
/// treated as permissible (it does not fail the requirement).
pub fn check_required_context(
    requires: &HashMap<String, ContextValue>,
    value_context: Option<&HashMap<String, String>>,
) -> bool {
    for (key, required) in requires {
        if let Some(actual) = value_context.and_then(|c| c.get(key)) {
            if !required.matches(actual) {
                return false;
            }
        }
        // missing key: permissible, keep checking other keys
    }
    true
}

/// True if `value_context` does NOT match any key in `excludes` (i.e. the
/// value survives exclusion). A value with no context always matches
/// (survives), since there is nothing to exclude on.
pub fn check_excluded_context(
    excludes: &HashMap<String, ContextValue>,
    value_context: Option<&HashMap<String, String>>,
) -> bool {
    let Some(value_context) = value_context else {
        return true;
    };
    for (key, excluded) in excludes {
        if let Some(actual) = value_context.get(key) {
            if excluded.matches(actual) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn required_context_permits_missing_keys() {
        let mut requires = HashMap::new();
        requires.insert(
            "domain".to_string(),
            ContextValue::Scalar("light".to_string()),
        );
        // value has no "domain" key at all: permissible
        assert!(check_required_context(&requires, Some(&ctx(&[("area", "kitchen")]))));
        assert!(check_required_context(&requires, None));
    }

    #[test]
    fn required_context_rejects_mismatched_scalar() {
        let mut requires = HashMap::new();
        requires.insert(
            "domain".to_string(),
            ContextValue::Scalar("light".to_string()),
        );
        assert!(!check_required_context(&requires, Some(&ctx(&[("domain", "fan")]))));
        assert!(check_required_context(&requires, Some(&ctx(&[("domain", "light")]))));
    }

    #[test]
    fn required_context_collection_is_membership() {
        let mut requires = HashMap::new();
        requires.insert(
            "domain".to_string(),
            ContextValue::Collection(vec!["light".to_string(), "switch".to_string()]),
        );
        assert!(check_required_context(&requires, Some(&ctx(&[("domain", "switch")]))));
        assert!(!check_required_context(&requires, Some(&ctx(&[("domain", "fan")]))));
    }

    #[test]
    fn excludes_context_rejects_match_and_no_context_always_survives() {
        let mut excludes = HashMap::new();
        excludes.insert(
            "domain".to_string(),
            ContextValue::Scalar("light".to_string()),
        );
        assert!(!check_excluded_context(&excludes, Some(&ctx(&[("domain", "light")]))));
        assert!(check_excluded_context(&excludes, Some(&ctx(&[("domain", "fan")]))));
        assert!(check_excluded_context(&excludes, None));
    }
}
