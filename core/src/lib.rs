//! Grammar-to-FST compiler and fuzzy N-best resolver core.
//!
//! A template document (YAML sentences/lists/expansion_rules) is parsed into
//! an [`intents::Intents`] tree, compiled into a strict weighted FST
//! ([`compile`]), space-merged ([`passes`]), fuzzed with tolerant self-loops
//! ([`fuzzy`]), and later used to resolve ASR N-best hypotheses back into
//! decoded text ([`resolver`]). Determinization, composition and
//! shortest-path search are delegated to an external OpenFst-like tool
//! pipeline ([`tools`]), never reimplemented here.
pub mod compile;
pub mod config;
pub mod error;
pub mod expression;
pub mod fst;
pub mod fuzzy;
pub mod intents;
pub mod lexicon;
pub mod meta;
pub mod numbers;
pub mod passes;
pub mod resolve;
pub mod resolver;
pub mod template;
pub mod tools;

pub use compile::{compile, CompileOptions, G2pInfo};
pub use config::Config;
pub use error::{CompileError, TemplateShapeError, ToolError};
pub use expression::Expression;
pub use fst::Fst;
pub use intents::Intents;
pub use template::{load_document, parse_template};
