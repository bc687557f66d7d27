//! `gfst-decode`: resolves decoder N-best hypotheses against a pre-compiled
//! fuzzy FST and prints the decoded meta text and cost.
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentence_fst_core::config::Config;
use sentence_fst_core::resolver::{resolve, Hypothesis};
use sentence_fst_core::tools::ProcessToolRunner;

#[derive(Parser)]
#[command(name = "gfst-decode", about = "Resolve N-best hypotheses against a fuzzy FST")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one N-best file against a fuzzy FST.
    Resolve {
        #[arg(long)]
        fuzzy_fst: PathBuf,
        #[arg(long)]
        nbest: PathBuf,
        #[arg(long)]
        words_symbols: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Resolve {
            fuzzy_fst,
            nbest,
            words_symbols,
        } => run_resolve(&fuzzy_fst, &nbest, &words_symbols),
    }
}

/// Parses a `symbol id` table (the format [`sentence_fst_core::fst::Fst::write_symbols`]
/// emits) into an id -> symbol lookup, for remapping the integer-id N-best
/// records into word tokens before they reach the resolver.
fn load_symbol_table(path: &std::path::Path) -> anyhow::Result<HashMap<u32, String>> {
    let mut table = HashMap::new();
    for line in fs::read_to_string(path)?.lines() {
        let mut parts = line.split_whitespace();
        let (Some(symbol), Some(id)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let Ok(id) = id.parse::<u32>() {
            table.insert(id, symbol.to_string());
        }
    }
    Ok(table)
}

fn parse_nbest(text: &str, symbols: &HashMap<u32, String>) -> Vec<Hypothesis> {
    let mut hypotheses = Vec::new();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let Some(first) = parts.next() else { continue };
        if !first.starts_with("utt-") {
            continue;
        }
        let words: Vec<String> = parts
            .filter_map(|tok| tok.parse::<u32>().ok())
            .filter_map(|id| symbols.get(&id).cloned())
            .collect();
        hypotheses.push(words);
    }
    hypotheses
}

fn run_resolve(
    fuzzy_fst_path: &std::path::Path,
    nbest_path: &std::path::Path,
    words_symbols_path: &std::path::Path,
) -> anyhow::Result<()> {
    let config = Config::default();
    let symbols = load_symbol_table(words_symbols_path)?;
    let nbest_text = fs::read_to_string(nbest_path)?;
    let hypotheses = parse_nbest(&nbest_text, &symbols);

    let runner = ProcessToolRunner::new();
    let resolved = resolve(
        &runner,
        &hypotheses,
        &fuzzy_fst_path.display().to_string(),
        &words_symbols_path.display().to_string(),
        config.nbest_penalty,
    )?;

    match resolved {
        Some(result) if result.cost <= config.max_fuzzy_cost => {
            println!("{}", result.decoded.text);
        }
        Some(result) => {
            tracing::warn!(cost = result.cost, "rejected: fuzzy cost above threshold");
            println!();
        }
        None => {
            tracing::warn!("rejected: out of vocabulary");
            println!();
        }
    }

    Ok(())
}
