//! Slot lists, expansion rules and the intent/data scoping hierarchy.
use std::collections::HashMap;

use crate::expression::Expression;

/// A context value as it appears either on a slot value's own `context` map
/// or inside a `requires_context`/`excludes_context` spec. May be a bare
/// scalar, a `{value: ...}` wrapper, or a collection tested by membership.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Scalar(String),
    Wrapper(String),
    Collection(Vec<String>),
}

impl ContextValue {
    /// True if `other` satisfies this value under the scalar/wrapper/
    /// collection matching rules shared by requires/excludes checks.
    pub fn matches(&self, other: &str) -> bool {
        match self {
            ContextValue::Scalar(s) | ContextValue::Wrapper(s) => s == other,
            ContextValue::Collection(items) => items.iter().any(|v| v == other),
        }
    }
}

/// One alternative value of a [`TextSlotList`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextSlotValue {
    /// Spoken form. May itself be a further expression (nested alternatives),
    /// not only a literal chunk.
    pub text_in: Expression,
    /// Structured output override; defaults to the spoken text when absent.
    pub value_out: Option<String>,
    /// Per-value context used for `requires_context`/`excludes_context`
    /// filtering. Absent context always matches. Each entry is a plain
    /// scalar (e.g. `domain: "light"`); the richer scalar/wrapper/collection
    /// shapes apply to the `requires_context`/`excludes_context` spec
    /// itself, not to a value's own context.
    pub context: Option<HashMap<String, String>>,
}

impl TextSlotValue {
    pub fn new(text_in: Expression) -> Self {
        Self {
            text_in,
            value_out: None,
            context: None,
        }
    }
}

/// A closed numeric interval `[start, stop]` enumerated by `step` and
/// materialised through the number engine into word sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSlotList {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeSlotList {
    /// Arithmetic cardinality of the interval.
    pub fn count(&self) -> i64 {
        if self.step <= 0 || self.stop < self.start {
            return 0;
        }
        (self.stop - self.start) / self.step + 1
    }

    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        let mut n = self.start;
        std::iter::from_fn(move || {
            if n > self.stop {
                None
            } else {
                let cur = n;
                n += self.step;
                Some(cur)
            }
        })
    }
}

/// A named set of alternative values referenced from templates as `{name}`.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotList {
    Text(TextSlotList),
    Range(RangeSlotList),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSlotList {
    pub values: Vec<TextSlotValue>,
}

/// Per-group data: sentences, and the group-local slot lists/expansion
/// rules/context filters/metadata that scope them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentData {
    pub sentences: Vec<Expression>,
    pub slot_lists: HashMap<String, SlotList>,
    pub expansion_rules: HashMap<String, Expression>,
    pub requires_context: Option<HashMap<String, ContextValue>>,
    pub excludes_context: Option<HashMap<String, ContextValue>>,
    /// Sentence-level output override, e.g. `metadata.output` in the
    /// template document.
    pub metadata_output: Option<String>,
}

/// An intent groups one or more [`IntentData`] blocks plus cross-group
/// slot lists/expansion rules visible to all of its data groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intent {
    pub name: String,
    pub data: Vec<IntentData>,
}

/// The whole compiled-from-YAML template document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intents {
    pub intents: HashMap<String, Intent>,
    pub slot_lists: HashMap<String, SlotList>,
    pub expansion_rules: HashMap<String, Expression>,
}
