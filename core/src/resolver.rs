//! N-best hypothesis resolution: composes decoder N-best output against a
//! fuzzy FST to recover the closest in-grammar sentence, then decodes its
//! meta-output tokens back into text.
use std::fmt::Write as _;

use crate::error::ToolError;
use crate::fst::{Fst, EPS};
use crate::meta::{self, DecodedMeta};
use crate::tools::{stage, ToolRunner};

/// One ASR hypothesis: a ranked sequence of word tokens (`ark,t:-` style,
/// with the leading `utt-id` already stripped).
pub type Hypothesis = Vec<String>;

/// Per-rank weight applied when building the linear input FST.
pub fn rank_penalty(rank: usize, nbest_penalty: f32) -> f32 {
    rank as f32 * nbest_penalty
}

/// Build the linear "N-best lattice" FST: one chain per hypothesis, `w:w`
/// arcs, cumulative weight `rank * nbest_penalty`. Each chain's last state
/// is marked final.
pub fn build_nbest_fst(hypotheses: &[Hypothesis], nbest_penalty: f32) -> Fst {
    let mut fst = Fst::new();
    for (rank, hypothesis) in hypotheses.iter().enumerate() {
        let penalty = rank_penalty(rank, nbest_penalty);
        let mut state = fst.start;
        for word in hypothesis {
            state = fst
                .next_edge(state, Some(word), Some(word), Some(penalty))
                .expect("ASR word tokens never contain whitespace");
        }
        fst.accept(state);
    }
    fst
}

/// Result of a successful fuzzy resolution: the decoded meta-output and the
/// cumulative path cost (before the caller compares it against
/// `max_fuzzy_cost`).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedText {
    pub decoded: DecodedMeta,
    pub cost: f32,
}

/// Resolve `hypotheses` against the fuzzy FST at `fuzzy_fst_path` (already
/// compiled to OpenFst binary form by `core::fuzzy` + an external
/// `fstcompile`, same as the strict grammar) via the external tool
/// pipeline. Returns `Ok(None)` when no path through the fuzzy FST matches
/// any hypothesis ("out of vocabulary"); `Err` only for a non-zero tool
/// exit.
pub fn resolve(
    runner: &dyn ToolRunner,
    hypotheses: &[Hypothesis],
    fuzzy_fst_path: &str,
    words_symbols_path: &str,
    nbest_penalty: f32,
) -> Result<Option<ResolvedText>, ToolError> {
    let input_fst = build_nbest_fst(hypotheses, nbest_penalty);
    let mut input_fst_text = String::new();
    input_fst
        .write(&mut input_fst_text)
        .expect("writing FST text cannot fail");

    let stages = [
        stage("fstcompile", Vec::<String>::new()),
        stage("fstcompose", vec!["-".to_string(), fuzzy_fst_path.to_string()]),
        stage("fstshortestpath", Vec::<String>::new()),
        stage("fstrmepsilon", Vec::<String>::new()),
        stage("fsttopsort", Vec::<String>::new()),
        stage("fstproject", vec!["--project_type=output".to_string()]),
        stage(
            "fstprint",
            vec![format!("--osymbols={words_symbols_path}")],
        ),
    ];

    let stdout = runner.run_pipeline(&stages, input_fst_text.as_bytes())?;
    Ok(parse_fstprint_output(&stdout))
}

fn parse_fstprint_output(stdout: &[u8]) -> Option<ResolvedText> {
    let text = String::from_utf8_lossy(stdout);
    let mut words: Vec<String> = Vec::new();
    let mut cost = 0.0f32;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let word = parts[3];
        if parts.len() > 4 {
            if let Ok(w) = parts[4].parse::<f32>() {
                cost += w;
            }
        }
        if word == EPS {
            continue;
        }
        words.push(word.to_string());
    }

    if words.is_empty() {
        return None;
    }

    let mut joined = String::new();
    for (idx, word) in words.iter().enumerate() {
        if idx > 0 {
            joined.push(' ');
        }
        let _ = write!(joined, "{word}");
    }

    Some(ResolvedText {
        decoded: meta::decode_meta(&joined),
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockToolRunner;

    #[test]
    fn rank_penalty_scales_linearly() {
        assert_eq!(rank_penalty(0, 0.1), 0.0);
        assert_eq!(rank_penalty(2, 0.1), 0.2);
    }

    #[test]
    fn build_nbest_fst_marks_each_chain_final() {
        let hyps = vec![vec!["turn".to_string(), "on".to_string()]];
        let fst = build_nbest_fst(&hyps, 0.1);
        assert_eq!(fst.final_states().len(), 1);
    }

    #[test]
    fn resolve_returns_none_on_empty_output() {
        let runner = MockToolRunner::once(Ok(Vec::new()));
        let hyps = vec![vec!["turn".to_string(), "on".to_string()]];
        let result = resolve(&runner, &hyps, "/lang/G.fuzzy.fst", "words.txt", 0.1).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn resolve_parses_words_and_sums_cost() {
        let fstprint_output = "0 1 a a\n1 2 b b 0.5\n2\n";
        let runner = MockToolRunner::once(Ok(fstprint_output.as_bytes().to_vec()));
        let hyps = vec![vec!["a".to_string(), "b".to_string()]];
        let result = resolve(&runner, &hyps, "/lang/G.fuzzy.fst", "words.txt", 0.1)
            .unwrap()
            .unwrap();
        assert_eq!(result.decoded.text, "a b");
        assert_eq!(result.cost, 0.5);
    }

    #[test]
    fn resolve_surfaces_tool_errors() {
        let runner = MockToolRunner::once(Err(ToolError {
            program: "fstcompile".to_string(),
            status: 1,
            stderr: "bad input".to_string(),
        }));
        let hyps = vec![vec!["a".to_string()]];
        let err = resolve(&runner, &hyps, "/lang/G.fuzzy.fst", "words.txt", 0.1).unwrap_err();
        assert_eq!(err.program, "fstcompile");
    }
}
