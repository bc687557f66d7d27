//! Space removal / partial-word merging: the post-compilation pass that
//! turns the letter-at-a-time strict FST into one with whole-word arcs.
use std::collections::HashMap;

use crate::fst::{Fst, StateId, EPS, SPACE};
use crate::meta::{BEGIN_OUTPUT_TAG, END_OUTPUT, OUTPUT_TAG, SENTENCE_OUTPUT_TAG};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuppressOutput {
    Disabled,
    UntilEnd,
    UntilSpace,
}

/// Remove `<space>` tokens from `fst`, merging the letter/subword arcs
/// between spaces into single whole-word arcs, each charged `word_penalty`.
/// Output suppression state (driven by `__begin_output:` / `__end_output` /
/// `__sentence_output:` tags) ensures only one output wins per word.
pub fn remove_spaces(fst: &Fst, word_penalty: f32) -> Fst {
    let mut visited: HashMap<(StateId, StateId, usize), StateId> = HashMap::new();
    let mut out = Fst::new();

    for arc in fst.arcs_from(fst.start) {
        // Copy the initial weighted intent arc (the per-sentence <space>).
        let output_state = out.next_edge(out.start, None, None, arc.weight).unwrap();

        for (next_idx, next_arc) in fst.arcs_from(arc.to).iter().enumerate() {
            walk(
                fst,
                arc.to,
                next_arc,
                next_idx,
                String::new(),
                None,
                &mut visited,
                &mut out,
                output_state,
                SuppressOutput::Disabled,
                word_penalty,
            );
        }
    }

    out
}

#[allow(clippy::too_many_arguments)]
fn walk(
    fst: &Fst,
    state: StateId,
    arc: &crate::fst::Arc,
    arc_idx: usize,
    mut word: String,
    mut output_word: Option<String>,
    visited: &mut HashMap<(StateId, StateId, usize), StateId>,
    out: &mut Fst,
    mut output_state: StateId,
    mut suppress: SuppressOutput,
    word_penalty: f32,
) {
    if arc.in_label == SPACE {
        let key = (state, arc.to, arc_idx);
        let input_symbol = if word.is_empty() { EPS.to_string() } else { word.clone() };
        let mut output_symbol = input_symbol.clone();

        match suppress {
            SuppressOutput::UntilEnd | SuppressOutput::UntilSpace => {
                output_symbol = output_word.take().unwrap_or_else(|| EPS.to_string());
            }
            SuppressOutput::Disabled => {
                if let Some(pending) = output_word.take() {
                    output_symbol = pending;
                }
            }
        }

        if let Some(&cached) = visited.get(&key) {
            let weight = if input_symbol != EPS { Some(word_penalty) } else { None };
            out.add_arc(output_state, cached, Some(&input_symbol), Some(&output_symbol), weight)
                .expect("merged labels never contain whitespace");
            return;
        }

        let weight = if input_symbol != EPS { Some(word_penalty) } else { None };
        output_state = out
            .next_edge(output_state, Some(&input_symbol), Some(&output_symbol), weight)
            .expect("merged labels never contain whitespace");
        visited.insert(key, output_state);

        if fst.is_final(arc.to) {
            out.accept(output_state);
        }

        word = String::new();
        if suppress == SuppressOutput::UntilSpace {
            suppress = SuppressOutput::Disabled;
        }
    } else if arc.in_label != EPS {
        word.push_str(&arc.in_label);

        if suppress == SuppressOutput::Disabled
            && arc.out_label != EPS
            && arc.out_label != arc.in_label
        {
            suppress = SuppressOutput::UntilSpace;
            output_word = Some(arc.out_label.clone());
        }
    }

    if arc.out_label.starts_with(BEGIN_OUTPUT_TAG) {
        suppress = SuppressOutput::UntilEnd;
    } else if arc.out_label.starts_with(END_OUTPUT) {
        suppress = SuppressOutput::UntilSpace;
    } else if arc.out_label.starts_with(SENTENCE_OUTPUT_TAG) {
        output_state = out
            .next_edge(output_state, Some(EPS), Some(&arc.out_label), None)
            .expect("sentence-output tokens never contain whitespace");
    } else if arc.out_label.starts_with(OUTPUT_TAG) {
        output_word = Some(arc.out_label.clone());
    }

    for (next_idx, next_arc) in fst.arcs_from(arc.to).iter().enumerate() {
        walk(
            fst,
            arc.to,
            next_arc,
            next_idx,
            word.clone(),
            output_word.clone(),
            visited,
            out,
            output_state,
            suppress,
            word_penalty,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::Fst;

    /// Builds a strict FST for one sentence "on" spelled as two letter
    /// arcs (`o`, `n`) between boundary `<space>` arcs, as the compiler
    /// would emit for a short word.
    fn letters_fst() -> Fst {
        let mut fst = Fst::new();
        let s1 = fst.next_edge(fst.start, Some(SPACE), Some(SPACE), None).unwrap();
        let s2 = fst.next_edge(s1, Some("o"), Some("o"), None).unwrap();
        let s3 = fst.next_edge(s2, Some("n"), Some("n"), None).unwrap();
        let s4 = fst.next_edge(s3, Some(SPACE), Some(SPACE), None).unwrap();
        fst.accept(s4);
        fst
    }

    #[test]
    fn merges_letters_into_whole_word_arc() {
        let fst = letters_fst();
        let merged = remove_spaces(&fst, 0.03);
        let has_whole_word_arc = (0..merged.num_states()).any(|s| {
            merged
                .arcs_from(s)
                .iter()
                .any(|a| a.in_label == "on" && a.weight == Some(0.03))
        });
        assert!(has_whole_word_arc);
    }

    #[test]
    fn begin_end_output_suppresses_word_level_output() {
        let mut fst = Fst::new();
        let s1 = fst.next_edge(fst.start, Some(SPACE), Some(SPACE), None).unwrap();
        let s2 = fst.next_edge(s1, Some(EPS), Some(BEGIN_OUTPUT_TAG), None).unwrap();
        let token = "__output:NBUHK3Y="; // arbitrary well-formed-looking tag
        let s3 = fst.next_edge(s2, Some(EPS), Some(token.trim_end_matches('=')), None).unwrap();
        let s4 = fst.next_edge(s3, Some("k"), Some("k"), None).unwrap();
        let s5 = fst.next_edge(s4, Some(EPS), Some(END_OUTPUT), None).unwrap();
        let s6 = fst.next_edge(s5, Some(SPACE), Some(SPACE), None).unwrap();
        fst.accept(s6);

        let merged = remove_spaces(&fst, 0.03);
        // The whole-word arc's output must be the encoded token, not "k".
        let word_arc = (0..merged.num_states()).find_map(|s| {
            merged
                .arcs_from(s)
                .iter()
                .find(|a| a.in_label == "k")
                .cloned()
        });
        let arc = word_arc.expect("expected a whole-word arc for k");
        assert_eq!(arc.out_label, token.trim_end_matches('='));
    }

    #[test]
    fn sentence_output_tag_emitted_as_immediate_epsilon_arc() {
        let mut fst = Fst::new();
        let s1 = fst.next_edge(fst.start, Some(SPACE), Some(SPACE), None).unwrap();
        let tag = format!("{SENTENCE_OUTPUT_TAG}ORSXG5A");
        let s2 = fst.next_edge(s1, Some(EPS), Some(&tag), None).unwrap();
        let s3 = fst.next_edge(s2, Some("a"), Some("a"), None).unwrap();
        let s4 = fst.next_edge(s3, Some(SPACE), Some(SPACE), None).unwrap();
        fst.accept(s4);

        let merged = remove_spaces(&fst, 0.03);
        let has_sentence_tag = (0..merged.num_states()).any(|s| {
            merged
                .arcs_from(s)
                .iter()
                .any(|a| a.in_label == EPS && a.out_label == tag)
        });
        assert!(has_sentence_tag);
    }
}
