//! `gfst-compile`: loads a sentence template document, compiles it to a
//! strict FST, merges spaces/prunes, and writes both the strict and fuzzy
//! FST text forms.
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentence_fst_core::compile::{compile, CompileOptions, G2pInfo};
use sentence_fst_core::config::Config;
use sentence_fst_core::error::CompileError;
use sentence_fst_core::fuzzy::build_fuzzy;
use sentence_fst_core::lexicon::LexiconDatabase;
use sentence_fst_core::numbers::Num2WordsEngine;
use sentence_fst_core::passes::remove_spaces;
use sentence_fst_core::template::load_document;

#[derive(Parser)]
#[command(name = "gfst-compile", about = "Compile sentence templates into FSTs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a template document into a strict + fuzzy FST.
    Compile {
        #[arg(long)]
        sentences: PathBuf,
        #[arg(long, default_value = "en")]
        number_language: String,
        #[arg(long)]
        lexicon: Option<PathBuf>,
        #[arg(long, default_value = "grammar.fst.txt")]
        out_fst: PathBuf,
        #[arg(long, default_value = "grammar.fuzzy.fst.txt")]
        out_fuzzy: PathBuf,
        #[arg(long, default_value = "grammar.syms.txt")]
        out_symbols: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compile {
            sentences,
            number_language,
            lexicon,
            out_fst,
            out_fuzzy,
            out_symbols,
        } => run_compile(
            &sentences,
            &number_language,
            lexicon.as_deref(),
            &out_fst,
            &out_fuzzy,
            &out_symbols,
        ),
    }
}

fn run_compile(
    sentences_path: &std::path::Path,
    number_language: &str,
    lexicon_path: Option<&std::path::Path>,
    out_fst: &std::path::Path,
    out_fuzzy: &std::path::Path,
    out_symbols: &std::path::Path,
) -> anyhow::Result<()> {
    let yaml = fs::read_to_string(sentences_path)?;
    let intents = load_document(&yaml, "Default")?;

    let lexicon = LexiconDatabase::new();
    if let Some(path) = lexicon_path {
        for line in fs::read_to_string(path)?.lines() {
            let word = line.split_whitespace().next();
            if let Some(word) = word {
                lexicon.add(word.to_string());
            }
        }
    }
    let g2p_info = G2pInfo::new(&lexicon);

    let number_engine = match number_language {
        "en" => Some(Num2WordsEngine::english()),
        _ => None,
    };

    let config = Config::default();
    let opts = CompileOptions {
        g2p_info: Some(&g2p_info),
        number_engine: number_engine.as_ref().map(|e| e as &dyn sentence_fst_core::numbers::NumberEngine),
        range_fallback_to_decimal: config.range_fallback_to_decimal,
        ..CompileOptions::default()
    };

    let strict = compile(&intents, &opts)?;
    let mut merged = remove_spaces(&strict, config.word_penalty);
    merged.prune();
    if !merged.has_accepting_path() {
        return Err(CompileError::EmptyGrammar.into());
    }

    fs::write(out_fst, merged.to_text())?;
    tracing::info!(path = %out_fst.display(), states = merged.num_states(), "wrote strict FST");

    let mut fuzzy = merged.clone();
    build_fuzzy(&mut fuzzy, &config);
    fs::write(out_fuzzy, fuzzy.to_text())?;
    tracing::info!(path = %out_fuzzy.display(), states = fuzzy.num_states(), "wrote fuzzy FST");

    let mut symbols = String::new();
    fuzzy.write_symbols(&mut symbols)?;
    fs::write(out_symbols, symbols)?;
    tracing::info!(path = %out_symbols.display(), "wrote symbol table");

    Ok(())
}
