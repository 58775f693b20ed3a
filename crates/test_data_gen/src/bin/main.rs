//! CLI for generating reference fixtures.
//!
//! Usage:
//!   gen-fixtures --scale small --seed 42 > fixtures/reference.sql

use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use test_data_gen::{Generator, RenderConfig, Renderer, Scale};

#[derive(Parser, Debug)]
#[command(name = "gen-fixtures")]
#[command(about = "Generate reference dimension fixtures for flight-mirror", long_about = None)]
struct Args {
    /// Scale preset: tiny, small, medium, large
    #[arg(short, long, default_value = "small")]
    scale: String,

    /// Random seed for reproducibility
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Rows per INSERT statement
    #[arg(long, default_value = "100")]
    batch_size: usize,

    /// Emit plain INSERTs that fail on existing keys
    #[arg(long)]
    strict: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let scale: Scale = args.scale.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let data = Generator::new(args.seed, scale).generate();
    let renderer = Renderer::new(RenderConfig {
        batch_size: args.batch_size,
        ignore_conflicts: !args.strict,
    });

    let mut out: Box<dyn Write> = match args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    renderer.render(&data, &mut out)?;
    out.flush()?;

    Ok(())
}
