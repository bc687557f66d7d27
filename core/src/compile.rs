//! Entry point: compiles a resolved template tree into a weighted FST.
use std::collections::HashMap;

use tracing::debug;

use crate::error::CompileError;
use crate::expression::{Alternative, Expression, Group, ListRef, RuleRef, TextChunk};
use crate::fst::{Fst, StateId, EPS, SPACE};
use crate::intents::{IntentData, Intents, SlotList, TextSlotValue};
use crate::lexicon::{self, LexiconDatabase, SplitCache};
use crate::meta::{self, BEGIN_OUTPUT_TAG, END_OUTPUT, SENTENCE_OUTPUT_TAG};
use crate::numbers::{NumberEngine, NumberRangeCache};
use crate::resolve;

/// Casing/g2p context threaded through compilation. Grouped the way the
/// source system groups "everything the lexicon splitter needs".
pub struct G2pInfo<'a> {
    pub lexicon: &'a LexiconDatabase,
    pub casing_func: Option<Box<dyn Fn(&str) -> String + 'a>>,
}

impl<'a> G2pInfo<'a> {
    pub fn new(lexicon: &'a LexiconDatabase) -> Self {
        Self {
            lexicon,
            casing_func: None,
        }
    }

    fn apply_casing(&self, s: &str) -> String {
        match &self.casing_func {
            Some(f) => f(s),
            None => s.to_string(),
        }
    }
}

/// Tunable options threaded through one `compile()` call.
pub struct CompileOptions<'a> {
    pub slot_lists: Option<&'a HashMap<String, SlotList>>,
    pub number_engine: Option<&'a dyn NumberEngine>,
    pub exclude_intents: Option<&'a std::collections::HashSet<String>>,
    pub include_intents: Option<&'a std::collections::HashSet<String>>,
    pub g2p_info: Option<&'a G2pInfo<'a>>,
    pub range_fallback_to_decimal: bool,
}

impl<'a> Default for CompileOptions<'a> {
    fn default() -> Self {
        Self {
            slot_lists: None,
            number_engine: None,
            exclude_intents: None,
            include_intents: None,
            g2p_info: None,
            range_fallback_to_decimal: false,
        }
    }
}

struct Ctx<'a> {
    intents: &'a Intents,
    opts: &'a CompileOptions<'a>,
    number_cache: NumberRangeCache,
    split_cache: SplitCache,
}

/// One alternative value produced while expanding a `ListRef`: either a
/// plain sub-expression, or one wrapped in an output-bearing block that
/// encodes `{text, list}` as a single meta token.
enum AltValue {
    Plain(Expression),
    WithOutput {
        expr: Expression,
        output_text: String,
        list_name: Option<String>,
    },
}

/// Compile `intents` into the "strict" (un-merged, letter/subword-level)
/// FST. Callers typically follow this with [`crate::passes::remove_spaces`]
/// and [`Fst::prune`].
pub fn compile(intents: &Intents, opts: &CompileOptions) -> Result<Fst, CompileError> {
    let ctx = Ctx {
        intents,
        opts,
        number_cache: NumberRangeCache::new(),
        split_cache: SplitCache::new(),
    };

    let mut fst = Fst::new();
    let final_state = fst.new_state();

    let mut total_sentences = 0i64;
    for intent in ctx.intents.intents.values() {
        if let Some(exclude) = ctx.opts.exclude_intents {
            if exclude.contains(&intent.name) {
                continue;
            }
        }
        if let Some(include) = ctx.opts.include_intents {
            if !include.contains(&intent.name) {
                continue;
            }
        }

        for data in &intent.data {
            let sentence_output = data.metadata_output.as_deref();

            for sentence in &data.sentences {
                total_sentences += get_count(sentence, ctx.intents, data);

                let sentence_state = fst.next_edge(fst.start, Some(SPACE), Some(SPACE), None)?;
                let sentence_state = match sentence_output {
                    Some(output) => {
                        let token = meta::encode_sentence_output(output);
                        fst.next_edge(sentence_state, Some(EPS), Some(&token), None)?
                    }
                    None => sentence_state,
                };

                let maybe_state = compile_expr(
                    sentence,
                    sentence_state,
                    &mut fst,
                    &ctx,
                    data,
                    sentence_output.is_some(),
                )?;

                let Some(state) = maybe_state else {
                    continue;
                };
                fst.add_arc(state, final_state, Some(SPACE), Some(SPACE), None)?;
            }
        }
    }
    debug!(total_sentences, "compiled grammar");

    fst.accept(final_state);
    Ok(fst)
}

fn compile_expr(
    expr: &Expression,
    state: StateId,
    fst: &mut Fst,
    ctx: &Ctx,
    intent_data: &IntentData,
    suppress_output: bool,
) -> Result<Option<StateId>, CompileError> {
    match expr {
        Expression::TextChunk(chunk) => compile_text_chunk(chunk, state, fst, ctx, suppress_output),
        Expression::Group(group) => compile_group(group, state, fst, ctx, intent_data, suppress_output),
        Expression::Alternative(alt) => {
            compile_alternative(alt, state, fst, ctx, intent_data, suppress_output)
        }
        Expression::ListRef(list_ref) => {
            compile_list_ref(list_ref, state, fst, ctx, intent_data, suppress_output)
        }
        Expression::RuleRef(rule_ref) => {
            compile_rule_ref(rule_ref, state, fst, ctx, intent_data, suppress_output)
        }
    }
}

fn compile_text_chunk(
    chunk: &TextChunk,
    mut state: StateId,
    fst: &mut Fst,
    ctx: &Ctx,
    suppress_output: bool,
) -> Result<Option<StateId>, CompileError> {
    let text = &chunk.original_text;

    if text == " " {
        return Ok(Some(fst.next_edge(state, Some(SPACE), Some(SPACE), None)?));
    }

    let space_before = text.starts_with(' ');
    let space_after = text.ends_with(' ');
    let word = text.trim();
    if word.is_empty() {
        return Ok(Some(state));
    }

    if space_before {
        state = fst.next_edge(state, Some(SPACE), Some(SPACE), None)?;
    }

    // Literal phrases ("turn on the", "please") recur across a grammar's
    // sentences, so per-word splits are cached rather than recomputed.
    let sub_words: Vec<lexicon::SplitWord> = match ctx.opts.g2p_info {
        Some(g2p) => word
            .split_whitespace()
            .flat_map(|w| ctx.split_cache.get_or_split(w, g2p.lexicon, ctx.opts.number_engine))
            .collect(),
        None => word
            .split_whitespace()
            .map(|w| lexicon::SplitWord::plain(w.to_string()))
            .collect(),
    };

    let last_idx = sub_words.len().saturating_sub(1);
    for (idx, sub_word) in sub_words.iter().enumerate() {
        // `sub_word.output == None` already means "force epsilon" (a
        // number-expansion continuation word); suppression forces epsilon
        // unconditionally on top of that.
        let sub_output: Option<String> = if suppress_output {
            None
        } else {
            sub_word.output.clone()
        };

        let surface = match ctx.opts.g2p_info {
            Some(g2p) => g2p.apply_casing(&sub_word.surface),
            None => sub_word.surface.clone(),
        };

        state = fst.next_edge(
            state,
            Some(&surface),
            sub_output.as_deref().or(Some(EPS)),
            None,
        )?;

        if idx != last_idx {
            state = fst.next_edge(state, Some(SPACE), Some(SPACE), None)?;
        }
    }

    if space_after {
        state = fst.next_edge(state, Some(SPACE), Some(SPACE), None)?;
    }

    Ok(Some(state))
}

fn compile_group(
    group: &Group,
    mut state: StateId,
    fst: &mut Fst,
    ctx: &Ctx,
    intent_data: &IntentData,
    suppress_output: bool,
) -> Result<Option<StateId>, CompileError> {
    for item in &group.items {
        let Some(next) = compile_expr(item, state, fst, ctx, intent_data, suppress_output)? else {
            return Ok(None);
        };
        state = next;
    }
    Ok(Some(state))
}

fn compile_alternative(
    alt: &Alternative,
    start: StateId,
    fst: &mut Fst,
    ctx: &Ctx,
    intent_data: &IntentData,
    suppress_output: bool,
) -> Result<Option<StateId>, CompileError> {
    let end = fst.new_state();
    for item in &alt.items {
        let Some(item_state) = compile_expr(item, start, fst, ctx, intent_data, suppress_output)?
        else {
            continue;
        };
        if item_state == start {
            continue;
        }
        fst.add_arc(item_state, end, None, None, None)?;
    }
    if alt.optional {
        fst.add_arc(start, end, None, None, None)?;
    }
    Ok(Some(end))
}

/// Compile a list of [`AltValue`]s as an alternative (used by `ListRef`
/// expansion, where each value may or may not carry its own output block).
fn compile_alt_values(
    values: &[AltValue],
    start: StateId,
    fst: &mut Fst,
    ctx: &Ctx,
    intent_data: &IntentData,
    suppress_output: bool,
) -> Result<Option<StateId>, CompileError> {
    let end = fst.new_state();
    let mut any = false;
    for value in values {
        let maybe_state = match value {
            AltValue::Plain(expr) => {
                compile_expr(expr, start, fst, ctx, intent_data, suppress_output)?
            }
            AltValue::WithOutput {
                expr,
                output_text,
                list_name,
            } => compile_with_output(
                expr,
                output_text,
                list_name.as_deref(),
                start,
                fst,
                ctx,
                intent_data,
            )?,
        };
        let Some(item_state) = maybe_state else {
            continue;
        };
        any = true;
        if item_state == start {
            continue;
        }
        fst.add_arc(item_state, end, None, None, None)?;
    }
    if !any {
        return Ok(None);
    }
    Ok(Some(end))
}

/// Wrap `expr` in `__begin_output:` / encoded-meta / `__end_output` arcs.
/// The enclosed children have their own output symbols forced to epsilon
/// (`suppress_output = true`) so only the encoded token carries output.
fn compile_with_output(
    expr: &Expression,
    output_text: &str,
    list_name: Option<&str>,
    state: StateId,
    fst: &mut Fst,
    ctx: &Ctx,
    intent_data: &IntentData,
) -> Result<Option<StateId>, CompileError> {
    let state = fst.next_edge(state, Some(EPS), Some(BEGIN_OUTPUT_TAG), None)?;
    let token = meta::encode_output(output_text, list_name);
    let state = fst.next_edge(state, Some(EPS), Some(&token), None)?;

    let Some(state) = compile_expr(expr, state, fst, ctx, intent_data, true)? else {
        return Ok(None);
    };

    let state = fst.next_edge(state, Some(EPS), Some(END_OUTPUT), None)?;
    Ok(Some(state))
}

fn compile_list_ref(
    list_ref: &ListRef,
    state: StateId,
    fst: &mut Fst,
    ctx: &Ctx,
    intent_data: &IntentData,
    suppress_output: bool,
) -> Result<Option<StateId>, CompileError> {
    let slot_list =
        resolve::lookup_slot_list(&list_ref.list_name, ctx.opts.slot_lists, intent_data, ctx.intents);

    let Some(slot_list) = slot_list else {
        // Unresolved list: placeholder arc, pruned unless reached.
        let word = format!("{{{}}}", list_ref.list_name);
        fst.add_arc(state, state, Some(&word), Some(&word), None)?;
        return Ok(None);
    };

    match slot_list {
        SlotList::Text(text_list) => {
            let values = filter_and_wrap_text_values(&text_list.values, list_ref, intent_data);
            if values.is_empty() {
                return Ok(None);
            }
            compile_alt_values(&values, state, fst, ctx, intent_data, suppress_output)
        }
        SlotList::Range(range_list) => {
            let renderings = ctx.number_cache.expand(
                ctx.opts.number_engine,
                range_list.start,
                range_list.stop,
                range_list.step,
            );

            let values: Vec<AltValue> = if renderings.is_empty() {
                if ctx.opts.number_engine.is_none() && ctx.opts.range_fallback_to_decimal {
                    range_list
                        .values()
                        .map(|n| AltValue::Plain(Expression::text(n.to_string())))
                        .collect()
                } else {
                    Vec::new()
                }
            } else {
                renderings
                    .into_iter()
                    .map(|r| AltValue::WithOutput {
                        expr: Expression::text(r.spoken),
                        output_text: r.decimal,
                        list_name: Some(list_ref.effective_slot_name().to_string()),
                    })
                    .collect()
            };

            if values.is_empty() {
                return Ok(None);
            }
            compile_alt_values(&values, state, fst, ctx, intent_data, suppress_output)
        }
    }
}

fn filter_and_wrap_text_values(
    values: &[TextSlotValue],
    list_ref: &ListRef,
    intent_data: &IntentData,
) -> Vec<AltValue> {
    let mut out = Vec::new();
    for value in values {
        if let Some(requires) = &intent_data.requires_context {
            if !resolve::check_required_context(requires, value.context.as_ref()) {
                continue;
            }
        }
        if let Some(excludes) = &intent_data.excludes_context {
            if !resolve::check_excluded_context(excludes, value.context.as_ref()) {
                continue;
            }
        }

        let output_text = value_output_text(value);
        match output_text {
            Some(text) => out.push(AltValue::WithOutput {
                expr: value.text_in.clone(),
                output_text: text,
                list_name: Some(list_ref.effective_slot_name().to_string()),
            }),
            None => out.push(AltValue::Plain(value.text_in.clone())),
        }
    }
    out
}

fn value_output_text(value: &TextSlotValue) -> Option<String> {
    if let Expression::TextChunk(chunk) = &value.text_in {
        return Some(chunk.original_text.trim().to_string());
    }
    value.value_out.clone()
}

fn compile_rule_ref(
    rule_ref: &RuleRef,
    state: StateId,
    fst: &mut Fst,
    ctx: &Ctx,
    intent_data: &IntentData,
    suppress_output: bool,
) -> Result<Option<StateId>, CompileError> {
    let rule_body = resolve::lookup_expansion_rule(&rule_ref.rule_name, intent_data, ctx.intents)
        .ok_or_else(|| CompileError::UnknownRule(rule_ref.rule_name.clone()))?;
    compile_expr(rule_body, state, fst, ctx, intent_data, suppress_output)
}

/// Number of distinct sentences `e` expands to, used only for logging/
/// diagnostics (not compilation correctness).
pub fn get_count(e: &Expression, intents: &Intents, intent_data: &IntentData) -> i64 {
    match e {
        Expression::Group(group) => group
            .items
            .iter()
            .map(|item| get_count(item, intents, intent_data))
            .product(),
        Expression::Alternative(alt) => {
            alt.items.iter().map(|item| get_count(item, intents, intent_data)).sum()
        }
        Expression::ListRef(list_ref) => {
            match resolve::lookup_slot_list(&list_ref.list_name, None, intent_data, intents) {
                Some(SlotList::Text(text_list)) => text_list
                    .values
                    .iter()
                    .map(|v| get_count(&v.text_in, intents, intent_data))
                    .sum(),
                Some(SlotList::Range(range_list)) => range_list.count(),
                None => 1,
            }
        }
        Expression::RuleRef(rule_ref) => {
            match resolve::lookup_expansion_rule(&rule_ref.rule_name, intent_data, intents) {
                Some(body) => get_count(body, intents, intent_data),
                None => 1,
            }
        }
        Expression::TextChunk(_) => 1,
    }
}

/// Least common multiple of a slice of integers; `1` for an empty slice.
pub fn lcm(nums: &[i64]) -> i64 {
    fn gcd(a: i64, b: i64) -> i64 {
        if b == 0 {
            a.abs()
        } else {
            gcd(b, a % b)
        }
    }
    nums.iter().copied().fold(1, |acc, n| acc * n / gcd(acc, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn intents_with_sentence(sentence: Expression) -> Intents {
        let mut data = IntentData::default();
        data.sentences = vec![sentence];
        let intent = crate::intents::Intent {
            name: "TestIntent".to_string(),
            data: vec![data],
        };
        let mut intents = Intents::default();
        intents.intents.insert("TestIntent".to_string(), intent);
        intents
    }

    #[test]
    fn compiles_simple_text_without_g2p() {
        let intents = intents_with_sentence(Expression::text("turn on"));
        let opts = CompileOptions::default();
        let fst = compile(&intents, &opts).unwrap();
        let strings = fst.to_strings(false);
        assert!(strings.iter().any(|s| s.contains("turn")));
    }

    #[test]
    fn unknown_rule_ref_is_fatal() {
        let intents = intents_with_sentence(Expression::rule_ref("missing"));
        let opts = CompileOptions::default();
        let err = compile(&intents, &opts).unwrap_err();
        assert!(matches!(err, CompileError::UnknownRule(name) if name == "missing"));
    }

    #[test]
    fn unresolved_list_ref_is_dead_branch_not_error() {
        let intents = intents_with_sentence(Expression::list_ref("nope", None));
        let opts = CompileOptions::default();
        // Must not error; the sentence is simply dropped (no accepting path
        // besides the shared final state, which still exists).
        let fst = compile(&intents, &opts).unwrap();
        assert!(fst.num_states() >= 1);
    }

    #[test]
    fn alternative_compiles_all_branches() {
        let alt = Expression::alternative(
            vec![Expression::text("on"), Expression::text("off")],
            false,
        );
        let intents = intents_with_sentence(alt);
        let opts = CompileOptions::default();
        let fst = compile(&intents, &opts).unwrap();
        let strings = fst.to_strings(false);
        assert!(strings.iter().any(|s| s.contains("on")));
        assert!(strings.iter().any(|s| s.contains("off")));
    }

    #[test]
    fn lcm_of_small_set() {
        assert_eq!(lcm(&[4, 6]), 12);
        assert_eq!(lcm(&[]), 1);
    }

    #[test]
    fn list_ref_output_block_carries_meta_token() {
        let mut slot_lists = Map::new();
        slot_lists.insert(
            "area".to_string(),
            SlotList::Text(crate::intents::TextSlotList {
                values: vec![TextSlotValue::new(Expression::text("kitchen"))],
            }),
        );
        let mut data = IntentData::default();
        data.sentences = vec![Expression::group(vec![
            Expression::text("turn on the "),
            Expression::list_ref("area", None),
        ])];
        data.slot_lists = slot_lists;
        let intent = crate::intents::Intent {
            name: "TestIntent".to_string(),
            data: vec![data],
        };
        let mut intents = Intents::default();
        intents.intents.insert("TestIntent".to_string(), intent);

        let opts = CompileOptions::default();
        let fst = compile(&intents, &opts).unwrap();
        let has_meta_arc = (0..fst.num_states()).any(|s| {
            fst.arcs_from(s)
                .iter()
                .any(|a| a.out_label == BEGIN_OUTPUT_TAG)
        });
        assert!(has_meta_arc);
    }
}
