//! Error kinds for template parsing, compilation and external tool invocation.
use thiserror::Error;

/// Errors raised while parsing a template document (file+line where known).
#[derive(Debug, Error)]
pub enum TemplateShapeError {
    #[error("template document has no `sentences` key")]
    MissingSentences,

    #[error("unterminated '{opener}' in template: {text:?}")]
    Unterminated { opener: char, text: String },

    #[error("unterminated '{{' list reference in template: {text:?}")]
    UnterminatedListRef { text: String },

    #[error("unterminated '<' rule reference in template: {text:?}")]
    UnterminatedRuleRef { text: String },

    #[error("range list {name:?} is missing `from`/`to`")]
    MalformedRange { name: String },
}

/// Compile-time errors that abort the whole compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Shape(#[from] TemplateShapeError),

    #[error("unresolved expansion rule <{0}>")]
    UnknownRule(String),

    #[error("symbol violation: label {label:?} is empty or contains whitespace")]
    SymbolViolation { label: String },

    #[error("compiled grammar is empty after pruning")]
    EmptyGrammar,
}

/// An external tool (OpenFst/Kaldi/G2P binaries) exited non-zero.
#[derive(Debug, Error)]
#[error("tool {program:?} exited with status {status}: {stderr}")]
pub struct ToolError {
    pub program: String,
    pub status: i32,
    pub stderr: String,
}
