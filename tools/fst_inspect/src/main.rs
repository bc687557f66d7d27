//! Debugging aid: parses a text FST and prints state/arc counts plus a
//! bounded sample of accepted strings.
use std::collections::HashSet;
use std::env;
use std::fs;

use sentence_fst_core::fst::{Fst, StateId};

const MAX_SAMPLE_STRINGS: usize = 20;

fn main() -> anyhow::Result<()> {
    let path = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: fst_inspect FILE.fst.txt"))?;
    let text = fs::read_to_string(&path)?;
    let fst = parse_fst_text(&text)?;

    let num_arcs: usize = (0..fst.num_states()).map(|s| fst.arcs_from(s).len()).sum();
    println!("states: {}", fst.num_states());
    println!("arcs: {}", num_arcs);
    println!("final states: {}", fst.final_states().len());

    println!("sample strings:");
    for s in fst.to_strings(false).into_iter().take(MAX_SAMPLE_STRINGS) {
        println!("  {s}");
    }

    Ok(())
}

/// Parses the OpenFst text format ([`Fst::write`]'s output): arc lines
/// `from to ilabel olabel [weight]`, then bare final-state lines.
fn parse_fst_text(text: &str) -> anyhow::Result<Fst> {
    let mut fst = Fst::new();
    let mut states_seen: HashSet<StateId> = HashSet::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [from, to, ilabel, olabel] => {
                let (from, to) = (from.parse()?, to.parse()?);
                fst.add_arc(from, to, Some(ilabel), Some(olabel), None)
                    .map_err(|e| anyhow::anyhow!(e))?;
                states_seen.insert(from);
                states_seen.insert(to);
            }
            [from, to, ilabel, olabel, weight] => {
                let (from, to) = (from.parse()?, to.parse()?);
                let weight: f32 = weight.parse()?;
                fst.add_arc(from, to, Some(ilabel), Some(olabel), Some(weight))
                    .map_err(|e| anyhow::anyhow!(e))?;
                states_seen.insert(from);
                states_seen.insert(to);
            }
            [state] => {
                fst.accept(state.parse()?);
            }
            _ => {
                return Err(anyhow::anyhow!("malformed FST text line: {line:?}"));
            }
        }
    }

    Ok(fst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_fst_text() {
        let text = "0 1 a b 0.5\n1\n";
        let fst = parse_fst_text(text).unwrap();
        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.final_states().len(), 1);
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = parse_fst_text("0 1 a\n").unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
