//! Fuzzy FST builder: adds per-state self-loops to a compiled grammar FST
//! so composition against an N-best lattice can tolerate extra words.
use crate::config::Config;
use crate::fst::{Fst, EPS};

/// Add self-loops to every state of `fst`, in place:
/// - `s --<eps>:<eps>/epsilon_cost--> s` (free re-entry), and
/// - `s --w:<eps>/delete_cost--> s` for every word `w` in `fst.words` not
///   starting with `<` or `_` (consume-and-drop at a measurable cost).
pub fn build_fuzzy(fst: &mut Fst, config: &Config) {
    let num_states = fst.num_states();
    let deletable_words: Vec<String> = fst
        .words
        .iter()
        .filter(|w| !w.starts_with('<') && !w.starts_with('_'))
        .cloned()
        .collect();

    for state in 0..num_states {
        fst.add_arc(state, state, Some(EPS), Some(EPS), Some(config.fuzzy_epsilon_cost))
            .expect("<eps>:<eps> is always well-formed");
        for word in &deletable_words {
            fst.add_arc(state, state, Some(word), Some(EPS), Some(config.fuzzy_delete_cost))
                .expect("grammar words never contain whitespace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_epsilon_and_delete_self_loops_per_state() {
        let mut fst = Fst::new();
        let s1 = fst.next_edge(fst.start, Some("on"), None, None).unwrap();
        fst.accept(s1);

        build_fuzzy(&mut fst, &Config::default());

        let start_arcs = fst.arcs_from(fst.start);
        assert!(start_arcs
            .iter()
            .any(|a| a.in_label == EPS && a.out_label == EPS && a.weight == Some(0.0)));
        assert!(start_arcs
            .iter()
            .any(|a| a.in_label == "on" && a.out_label == EPS && a.weight == Some(1.0)));
    }

    #[test]
    fn skips_reserved_and_meta_prefixed_symbols() {
        let mut fst = Fst::new();
        fst.add_arc(fst.start, fst.start, Some("__output:ABC"), None, None)
            .unwrap();
        build_fuzzy(&mut fst, &Config::default());
        let delete_arcs: Vec<_> = fst
            .arcs_from(fst.start)
            .iter()
            .filter(|a| a.weight == Some(1.0))
            .collect();
        assert!(delete_arcs.is_empty());
    }
}
