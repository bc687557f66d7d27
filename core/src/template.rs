//! Template document ingestion: YAML loading into [`Intents`] plus a
//! hand-written recursive-descent parser from template strings into
//! [`Expression`] trees.
use std::collections::HashMap;

use serde::Deserialize;

use crate::error::TemplateShapeError;
use crate::expression::Expression;
use crate::intents::{
    ContextValue, Intent, IntentData, Intents, RangeSlotList, SlotList, TextSlotList,
    TextSlotValue,
};

/// Parse a template string into an `Expression` tree.
///
/// Grammar: `{name}` / `{name:slot}` list references, `<name>` rule
/// references, `(a|b|c)` alternatives, `[x]` optional groups (desugars to
/// `Alternative{items:[x], optional:true}`), literal runs of non-special
/// characters as `TextChunk`, and runs of whitespace collapsed to a single
/// `TextChunk(" ")` so word boundaries stay significant between tokens.
pub fn parse_template(text: &str) -> Result<Expression, TemplateShapeError> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0usize;
    // An empty stop set means parse_run only returns at end of input: a
    // stray top-level ')' or ']' has no opener to match, so it is kept as
    // literal text rather than treated as a shape error.
    let items = parse_run(&chars, &mut pos, &[])?;
    Ok(collapse(items))
}

fn collapse(mut items: Vec<Expression>) -> Expression {
    if items.len() == 1 {
        items.pop().unwrap()
    } else if items.is_empty() {
        Expression::text("")
    } else {
        Expression::group(items)
    }
}

fn flush_literal(literal: &mut String, items: &mut Vec<Expression>) {
    if !literal.is_empty() {
        items.push(Expression::text(std::mem::take(literal)));
    }
}

/// Parse a sequence of items, stopping at end-of-input or the first
/// occurrence of any character in `stops` (which is left unconsumed).
fn parse_run(
    chars: &[char],
    pos: &mut usize,
    stops: &[char],
) -> Result<Vec<Expression>, TemplateShapeError> {
    let mut items = Vec::new();
    let mut literal = String::new();

    while *pos < chars.len() && !stops.contains(&chars[*pos]) {
        let c = chars[*pos];
        match c {
            '(' => {
                flush_literal(&mut literal, &mut items);
                *pos += 1;
                items.push(parse_alternative(chars, pos)?);
            }
            '[' => {
                flush_literal(&mut literal, &mut items);
                *pos += 1;
                items.push(parse_optional(chars, pos)?);
            }
            '{' => {
                flush_literal(&mut literal, &mut items);
                *pos += 1;
                items.push(parse_list_ref(chars, pos)?);
            }
            '<' => {
                flush_literal(&mut literal, &mut items);
                *pos += 1;
                items.push(parse_rule_ref(chars, pos)?);
            }
            c if c.is_whitespace() => {
                flush_literal(&mut literal, &mut items);
                while *pos < chars.len() && chars[*pos].is_whitespace() {
                    *pos += 1;
                }
                items.push(Expression::text(" "));
            }
            _ => {
                literal.push(c);
                *pos += 1;
            }
        }
    }

    flush_literal(&mut literal, &mut items);
    Ok(items)
}

/// After consuming the opening `(`, parse pipe-separated branches until a
/// matching `)`.
fn parse_alternative(
    chars: &[char],
    pos: &mut usize,
) -> Result<Expression, TemplateShapeError> {
    let mut branches = Vec::new();
    loop {
        let branch_items = parse_run(chars, pos, &['|', ')'])?;
        branches.push(collapse(branch_items));

        if *pos >= chars.len() {
            return Err(TemplateShapeError::Unterminated {
                opener: '(',
                text: chars.iter().collect(),
            });
        }
        if chars[*pos] == '|' {
            *pos += 1;
            continue;
        }
        // chars[*pos] == ')'
        *pos += 1;
        break;
    }
    Ok(Expression::alternative(branches, false))
}

/// After consuming the opening `[`, parse the whole body as a single item
/// up to a matching `]`, desugaring to an optional `Alternative`.
fn parse_optional(chars: &[char], pos: &mut usize) -> Result<Expression, TemplateShapeError> {
    let items = parse_run(chars, pos, &[']'])?;
    if *pos >= chars.len() {
        return Err(TemplateShapeError::Unterminated {
            opener: '[',
            text: chars.iter().collect(),
        });
    }
    *pos += 1; // consume ']'
    Ok(Expression::alternative(vec![collapse(items)], true))
}

/// After consuming the opening `{`, read `name` or `name:slot` up to `}`.
fn parse_list_ref(chars: &[char], pos: &mut usize) -> Result<Expression, TemplateShapeError> {
    let start = *pos;
    while *pos < chars.len() && chars[*pos] != '}' {
        *pos += 1;
    }
    if *pos >= chars.len() {
        return Err(TemplateShapeError::UnterminatedListRef {
            text: chars.iter().collect(),
        });
    }
    let body: String = chars[start..*pos].iter().collect();
    *pos += 1; // consume '}'

    match body.split_once(':') {
        Some((name, slot)) => Ok(Expression::list_ref(name, Some(slot.to_string()))),
        None => Ok(Expression::list_ref(body, None)),
    }
}

/// After consuming the opening `<`, read `name` up to `>`.
fn parse_rule_ref(chars: &[char], pos: &mut usize) -> Result<Expression, TemplateShapeError> {
    let start = *pos;
    while *pos < chars.len() && chars[*pos] != '>' {
        *pos += 1;
    }
    if *pos >= chars.len() {
        return Err(TemplateShapeError::UnterminatedRuleRef {
            text: chars.iter().collect(),
        });
    }
    let name: String = chars[start..*pos].iter().collect();
    *pos += 1; // consume '>'
    Ok(Expression::rule_ref(name))
}

// --- YAML document ingestion -------------------------------------------

#[derive(Debug, Deserialize)]
struct RawDocument {
    sentences: Option<serde_yaml::Value>,
    #[serde(default)]
    lists: HashMap<String, serde_yaml::Value>,
    #[serde(default)]
    expansion_rules: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawRange {
    from: i64,
    to: i64,
    #[serde(default = "default_step")]
    step: i64,
}

fn default_step() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct RawSlotValue {
    #[serde(rename = "in")]
    text_in: String,
    out: Option<String>,
    context: Option<HashMap<String, String>>,
}

/// Load a single-intent template document (spec §6's external format) from
/// YAML text, producing an [`Intents`] with one synthetic intent holding
/// every parsed sentence. Multi-intent documents are a deployment-specific
/// concatenation of these, not a distinct wire format.
pub fn load_document(yaml: &str, intent_name: &str) -> Result<Intents, TemplateShapeError> {
    let raw: RawDocument = serde_yaml::from_str(yaml)
        .map_err(|_| TemplateShapeError::MissingSentences)?;

    let sentences_value = raw.sentences.ok_or(TemplateShapeError::MissingSentences)?;
    let sentences = parse_sentences_value(&sentences_value)?;

    let mut slot_lists = HashMap::new();
    for (name, value) in raw.lists {
        slot_lists.insert(name.clone(), parse_slot_list(&name, &value)?);
    }

    let mut expansion_rules = HashMap::new();
    for (name, template) in raw.expansion_rules {
        expansion_rules.insert(name, parse_template(&template)?);
    }

    let mut data = IntentData::default();
    data.sentences = sentences;

    let intent = Intent {
        name: intent_name.to_string(),
        data: vec![data],
    };

    let mut intents = Intents::default();
    intents.intents.insert(intent_name.to_string(), intent);
    intents.slot_lists = slot_lists;
    intents.expansion_rules = expansion_rules;
    Ok(intents)
}

fn parse_sentences_value(
    value: &serde_yaml::Value,
) -> Result<Vec<Expression>, TemplateShapeError> {
    let items = value
        .as_sequence()
        .ok_or(TemplateShapeError::MissingSentences)?;

    let mut sentences = Vec::new();
    for item in items {
        match item {
            serde_yaml::Value::String(s) => sentences.push(parse_template(s)?),
            serde_yaml::Value::Mapping(_) => {
                #[derive(Debug, Deserialize)]
                struct RawSentence {
                    #[serde(rename = "in")]
                    text_in: serde_yaml::Value,
                }
                let raw: RawSentence = serde_yaml::from_value(item.clone())
                    .map_err(|_| TemplateShapeError::MissingSentences)?;
                match raw.text_in {
                    serde_yaml::Value::String(s) => sentences.push(parse_template(&s)?),
                    serde_yaml::Value::Sequence(variants) => {
                        for v in variants {
                            if let serde_yaml::Value::String(s) = v {
                                sentences.push(parse_template(&s)?);
                            }
                        }
                    }
                    _ => return Err(TemplateShapeError::MissingSentences),
                }
            }
            _ => return Err(TemplateShapeError::MissingSentences),
        }
    }
    Ok(sentences)
}

fn parse_slot_list(name: &str, value: &serde_yaml::Value) -> Result<SlotList, TemplateShapeError> {
    if let Some(range_value) = value.get("range") {
        let range: RawRange = serde_yaml::from_value(range_value.clone()).map_err(|_| {
            TemplateShapeError::MalformedRange {
                name: name.to_string(),
            }
        })?;
        return Ok(SlotList::Range(RangeSlotList {
            start: range.from,
            stop: range.to,
            step: range.step,
        }));
    }
    if let Some(values) = value.get("values") {
        return Ok(SlotList::Text(parse_text_slot_list(values)?));
    }
    if value.is_sequence() {
        return Ok(SlotList::Text(parse_text_slot_list(value)?));
    }
    Err(TemplateShapeError::MalformedRange {
        name: name.to_string(),
    })
}

fn parse_text_slot_list(value: &serde_yaml::Value) -> Result<TextSlotList, TemplateShapeError> {
    let items = value.as_sequence().ok_or(TemplateShapeError::MissingSentences)?;
    let mut values = Vec::new();
    for item in items {
        let raw: RawSlotValue = match item {
            serde_yaml::Value::String(s) => RawSlotValue {
                text_in: s.clone(),
                out: None,
                context: None,
            },
            _ => serde_yaml::from_value(item.clone())
                .map_err(|_| TemplateShapeError::MissingSentences)?,
        };

        let text_in = parse_template(&raw.text_in)?;
        values.push(TextSlotValue {
            text_in,
            value_out: raw.out,
            context: raw.context,
        });
    }
    Ok(TextSlotList { values })
}

/// Convert a `requires_context`/`excludes_context` YAML mapping into the
/// richer [`ContextValue`] shapes (scalar, `{value: ...}` wrapper,
/// collection).
pub fn parse_context_spec(
    value: &serde_yaml::Value,
) -> Option<HashMap<String, ContextValue>> {
    let mapping = value.as_mapping()?;
    let mut out = HashMap::new();
    for (k, v) in mapping.iter() {
        let key = k.as_str()?.to_string();
        let parsed = match v {
            serde_yaml::Value::String(s) => ContextValue::Scalar(s.clone()),
            serde_yaml::Value::Sequence(items) => ContextValue::Collection(
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect(),
            ),
            serde_yaml::Value::Mapping(m) => {
                let wrapped = m.get("value")?;
                ContextValue::Wrapper(wrapped.as_str()?.to_string())
            }
            _ => continue,
        };
        out.insert(key, parsed);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_literal() {
        let expr = parse_template("turn on").unwrap();
        match expr {
            Expression::Group(g) => {
                assert_eq!(g.items.len(), 2);
                assert!(matches!(&g.items[0], Expression::TextChunk(c) if c.original_text == "turn"));
                assert!(matches!(&g.items[1], Expression::TextChunk(c) if c.original_text == " "));
            }
            other => panic!("expected a Group, got {other:?}"),
        }
    }

    #[test]
    fn parses_alternative_branches() {
        let expr = parse_template("(on|off)").unwrap();
        match expr {
            Expression::Alternative(alt) => {
                assert!(!alt.optional);
                assert_eq!(alt.items.len(), 2);
            }
            other => panic!("expected an Alternative, got {other:?}"),
        }
    }

    #[test]
    fn parses_optional_group() {
        let expr = parse_template("[please]").unwrap();
        match expr {
            Expression::Alternative(alt) => assert!(alt.optional),
            other => panic!("expected an optional Alternative, got {other:?}"),
        }
    }

    #[test]
    fn parses_list_ref_with_slot_name() {
        let expr = parse_template("{area:target}").unwrap();
        match expr {
            Expression::ListRef(list_ref) => {
                assert_eq!(list_ref.list_name, "area");
                assert_eq!(list_ref.slot_name.as_deref(), Some("target"));
            }
            other => panic!("expected a ListRef, got {other:?}"),
        }
    }

    #[test]
    fn parses_rule_ref() {
        let expr = parse_template("<greeting>").unwrap();
        assert!(matches!(expr, Expression::RuleRef(r) if r.rule_name == "greeting"));
    }

    #[test]
    fn unterminated_alternative_is_shape_error() {
        let err = parse_template("(on|off").unwrap_err();
        assert!(matches!(err, TemplateShapeError::Unterminated { opener: '(', .. }));
    }

    #[test]
    fn unterminated_list_ref_is_shape_error() {
        let err = parse_template("{area").unwrap_err();
        assert!(matches!(err, TemplateShapeError::UnterminatedListRef { .. }));
    }

    #[test]
    fn nested_optional_inside_alternative() {
        let expr = parse_template("(turn on|turn [the] light)").unwrap();
        match expr {
            Expression::Alternative(alt) => assert_eq!(alt.items.len(), 2),
            other => panic!("expected an Alternative, got {other:?}"),
        }
    }

    #[test]
    fn load_document_requires_sentences_key() {
        let err = load_document("lists: {}", "Test").unwrap_err();
        assert!(matches!(err, TemplateShapeError::MissingSentences));
    }

    #[test]
    fn load_document_parses_sentences_lists_and_rules() {
        let yaml = r#"
sentences:
  - "turn on the {area}"
lists:
  area:
    values:
      - "kitchen"
      - "living room"
expansion_rules:
  greeting: "hello"
"#;
        let intents = load_document(yaml, "TestIntent").unwrap();
        assert_eq!(intents.intents.len(), 1);
        assert_eq!(intents.slot_lists.len(), 1);
        assert_eq!(intents.expansion_rules.len(), 1);
    }

    #[test]
    fn load_document_parses_range_list() {
        let yaml = r#"
sentences:
  - "set to {percent}"
lists:
  percent:
    range:
      from: 1
      to: 10
"#;
        let intents = load_document(yaml, "TestIntent").unwrap();
        match intents.slot_lists.get("percent").unwrap() {
            SlotList::Range(r) => {
                assert_eq!(r.start, 1);
                assert_eq!(r.stop, 10);
                assert_eq!(r.step, 1);
            }
            _ => panic!("expected a range slot list"),
        }
    }
}
