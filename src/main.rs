use anyhow::Context as _;
use clap::Parser;
use parsegen::Grammar;
use std::{fs, path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Write the automaton dump to the specified path.
    #[arg(short, long)]
    automaton: Option<PathBuf>,

    /// The path of the grammar definition file.
    input: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    let source = fs::read_to_string(&args.input)
        .with_context(|| anyhow::anyhow!("failed to read {}", args.input.display()))?;

    let s = Instant::now();
    let grammar = Grammar::compile(&source)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.input.display()))?;
    tracing::info!("compile: {:?} elapsed", s.elapsed());

    println!("{}", grammar);
    match args.automaton {
        Some(path) => {
            fs::write(&path, grammar.automaton().to_string()).with_context(|| {
                anyhow::anyhow!("failed to write the automaton dump to {}", path.display())
            })?;
        }
        None => println!("{}", grammar.automaton()),
    }

    Ok(())
}
