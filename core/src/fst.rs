//! Symbol-aware FST core: states, weighted arcs, builders, text serialization.
//!
//! States are indices into a contiguous array; arcs live in a parallel
//! `Vec<Vec<Arc>>` keyed by the `from` state. The core does not itself
//! determinize, minimize or compose — those are delegated to an external
//! OpenFst-like tool pipeline (see [`crate::tools`]).
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::CompileError;

/// Epsilon: the empty symbol.
pub const EPS: &str = "<eps>";
/// Word-boundary marker.
pub const SPACE: &str = "<space>";

/// A state identifier. States are allocated monotonically from `new_state`.
pub type StateId = usize;

/// A single weighted arc, `from -> to` implied by its position in [`Fst::arcs`].
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub to: StateId,
    pub in_label: String,
    pub out_label: String,
    pub weight: Option<f32>,
}

/// A directed multigraph of states and weighted input/output arcs.
#[derive(Debug, Clone)]
pub struct Fst {
    arcs: Vec<Vec<Arc>>,
    final_states: HashSet<StateId>,
    /// Distinct non-epsilon input labels seen via `add_arc`.
    pub words: HashSet<String>,
    /// Distinct non-epsilon output labels seen via `add_arc`.
    pub output_words: HashSet<String>,
    pub start: StateId,
}

impl Default for Fst {
    fn default() -> Self {
        Self::new()
    }
}

impl Fst {
    /// Create an FST with just the start state `0`.
    pub fn new() -> Self {
        Self {
            arcs: vec![Vec::new()],
            final_states: HashSet::new(),
            words: HashSet::new(),
            output_words: HashSet::new(),
            start: 0,
        }
    }

    /// Number of states currently allocated.
    pub fn num_states(&self) -> usize {
        self.arcs.len()
    }

    /// Arcs leaving `state` (empty slice if `state` has none, e.g. out of range).
    pub fn arcs_from(&self, state: StateId) -> &[Arc] {
        self.arcs.get(state).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.final_states.contains(&state)
    }

    pub fn final_states(&self) -> &HashSet<StateId> {
        &self.final_states
    }

    /// Allocate a fresh state and return its id.
    pub fn new_state(&mut self) -> StateId {
        self.arcs.push(Vec::new());
        self.arcs.len() - 1
    }

    /// Add a weighted arc `from -> to`, validating labels and tracking
    /// `words`/`output_words`. `in_label` defaults to `<eps>`; `out_label`
    /// defaults to `in_label` when not given.
    pub fn add_arc(
        &mut self,
        from: StateId,
        to: StateId,
        in_label: Option<&str>,
        out_label: Option<&str>,
        weight: Option<f32>,
    ) -> Result<(), CompileError> {
        let in_label = in_label.unwrap_or(EPS).to_string();
        let out_label = out_label.unwrap_or(&in_label).to_string();

        if in_label.contains(char::is_whitespace) || out_label.contains(char::is_whitespace) {
            return Err(CompileError::SymbolViolation {
                label: format!("{in_label}/{out_label}"),
            });
        }
        if in_label.is_empty() || out_label.is_empty() {
            return Err(CompileError::SymbolViolation {
                label: format!("{in_label}/{out_label}"),
            });
        }

        if in_label != EPS {
            self.words.insert(in_label.clone());
        }
        if out_label != EPS {
            self.output_words.insert(out_label.clone());
        }

        while self.arcs.len() <= from.max(to) {
            self.arcs.push(Vec::new());
        }

        self.arcs[from].push(Arc {
            to,
            in_label,
            out_label,
            weight,
        });
        Ok(())
    }

    /// Allocate a new `to` state, add the arc `from -> to`, and return `to`.
    /// The common building idiom used throughout the compiler.
    pub fn next_edge(
        &mut self,
        from: StateId,
        in_label: Option<&str>,
        out_label: Option<&str>,
        weight: Option<f32>,
    ) -> Result<StateId, CompileError> {
        let to = self.new_state();
        self.add_arc(from, to, in_label, out_label, weight)?;
        Ok(to)
    }

    /// Mark `state` as accepting.
    pub fn accept(&mut self, state: StateId) {
        while self.arcs.len() <= state {
            self.arcs.push(Vec::new());
        }
        self.final_states.insert(state);
    }

    /// Emit the OpenFst text format: one arc per line
    /// `from to in out [weight]`, then one line per final state.
    pub fn write(&self, out: &mut impl std::fmt::Write) -> std::fmt::Result {
        for (state, arcs) in self.arcs.iter().enumerate() {
            for arc in arcs {
                match arc.weight {
                    Some(w) => writeln!(
                        out,
                        "{} {} {} {} {}",
                        state, arc.to, arc.in_label, arc.out_label, w
                    )?,
                    None => writeln!(out, "{} {} {} {}", state, arc.to, arc.in_label, arc.out_label)?,
                }
            }
        }
        for state in &self.final_states {
            writeln!(out, "{}", state)?;
        }
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut s = String::new();
        self.write(&mut s).expect("writing to String cannot fail");
        s
    }

    /// Emit a symbol table (`symbol id` lines, `<eps>=0` reserved) covering
    /// every label used by this FST.
    pub fn write_symbols(&self, out: &mut impl std::fmt::Write) -> std::fmt::Result {
        let mut symbols: Vec<(String, usize)> = vec![(EPS.to_string(), 0)];
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(EPS);

        for arcs in &self.arcs {
            for arc in arcs {
                if seen.insert(arc.in_label.as_str()) {
                    symbols.push((arc.in_label.clone(), symbols.len()));
                }
                if seen.insert(arc.out_label.as_str()) {
                    symbols.push((arc.out_label.clone(), symbols.len()));
                }
            }
        }
        for (symbol, id) in &symbols {
            writeln!(out, "{} {}", symbol, id)?;
        }
        Ok(())
    }

    /// Iteratively remove states with no outgoing arcs that are not final,
    /// together with any incoming arcs that targeted them, until a
    /// fixpoint. Deterministic and order-independent.
    pub fn prune(&mut self) {
        loop {
            let mut dead: HashSet<StateId> = HashSet::new();
            for state in 0..self.arcs.len() {
                if self.arcs[state].is_empty() && !self.final_states.contains(&state) {
                    dead.insert(state);
                }
            }
            if dead.is_empty() {
                break;
            }
            for arcs in self.arcs.iter_mut() {
                arcs.retain(|arc| !dead.contains(&arc.to));
            }
        }
    }

    /// Whether any accepting path remains from the start state. After
    /// `prune()` runs to its fixpoint, the only way this is false is an
    /// empty start state: no outgoing arcs and not itself final.
    pub fn has_accepting_path(&self) -> bool {
        self.is_final(self.start) || !self.arcs_from(self.start).is_empty()
    }

    /// Enumerate all accepting paths as whitespace-joined strings of
    /// non-epsilon input labels. Unbounded; callers are responsible for
    /// only calling this on small/acyclic FSTs (e.g. in tests).
    pub fn to_strings(&self, add_spaces: bool) -> Vec<String> {
        let mut out = Vec::new();
        self.to_strings_from(self.start, String::new(), add_spaces, &mut out);
        out
    }

    fn to_strings_from(
        &self,
        state: StateId,
        text: String,
        add_spaces: bool,
        out: &mut Vec<String>,
    ) {
        if self.is_final(state) {
            let normalized: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !normalized.is_empty() {
                out.push(normalized);
            }
        }

        for arc in self.arcs_from(state) {
            let mut next_text = text.clone();
            if arc.in_label == SPACE {
                next_text.push(' ');
            } else if arc.in_label != EPS {
                if add_spaces {
                    let _ = write!(next_text, " {}", arc.in_label);
                } else {
                    next_text.push_str(&arc.in_label);
                }
            }
            self.to_strings_from(arc.to, next_text, add_spaces, out);
        }
    }
}
