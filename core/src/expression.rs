//! In-memory representation of template expressions.
//!
//! Nodes are immutable once built; equality is structural (`#[derive(PartialEq)]`).

/// A literal run of text. `original_text` preserves surrounding whitespace:
/// whitespace in a template denotes a word boundary and is materialised as
/// a `<space>` arc during compilation, so trimming it here would lose
/// information the compiler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub original_text: String,
}

impl TextChunk {
    pub fn new(original_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
        }
    }
}

/// `(a|b|c)` or `[x]`: matches any one item. `optional` adds an implicit
/// epsilon branch around the whole alternative (`[x]` desugars to
/// `Alternative{items: [x], optional: true}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub items: Vec<Expression>,
    pub optional: bool,
}

/// Plain concatenation of child expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub items: Vec<Expression>,
}

/// `{list_name}` or `{list_name:slot_name}`: reference to a named slot list.
/// `slot_name` defaults to `list_name` when the template omits `:slot_name`
/// and is used as the key under which a matched value's output is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRef {
    pub list_name: String,
    pub slot_name: Option<String>,
}

impl ListRef {
    /// The slot key a matched value is recorded under.
    pub fn effective_slot_name(&self) -> &str {
        self.slot_name.as_deref().unwrap_or(&self.list_name)
    }
}

/// `<rule_name>`: inlines the referenced expansion rule at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRef {
    pub rule_name: String,
}

/// A node in a template's expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    TextChunk(TextChunk),
    Alternative(Alternative),
    Group(Group),
    ListRef(ListRef),
    RuleRef(RuleRef),
}

impl Expression {
    pub fn text(s: impl Into<String>) -> Self {
        Expression::TextChunk(TextChunk::new(s))
    }

    pub fn group(items: Vec<Expression>) -> Self {
        Expression::Group(Group { items })
    }

    pub fn alternative(items: Vec<Expression>, optional: bool) -> Self {
        Expression::Alternative(Alternative { items, optional })
    }

    pub fn list_ref(list_name: impl Into<String>, slot_name: Option<String>) -> Self {
        Expression::ListRef(ListRef {
            list_name: list_name.into(),
            slot_name,
        })
    }

    pub fn rule_ref(rule_name: impl Into<String>) -> Self {
        Expression::RuleRef(RuleRef {
            rule_name: rule_name.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_identity() {
        let a = Expression::text("turn on");
        let b = Expression::text("turn on");
        assert_eq!(a, b);
    }

    #[test]
    fn list_ref_defaults_slot_name_to_list_name() {
        let r = ListRef {
            list_name: "duration".to_string(),
            slot_name: None,
        };
        assert_eq!(r.effective_slot_name(), "duration");
    }
}
