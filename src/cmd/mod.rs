mod check;
mod delete;
mod generate;
mod init;
mod max;
mod refs;
mod seed;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use flight_mirror::config::{EngineConfig, MirrorConfig};
use flight_mirror::domain::DomainPolicy;
use flight_mirror::engine::{DuckDatabase, DuckSession};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Database files used when neither the config nor the flags name one
const DEFAULT_ENGINE_A_PATH: &str = "engine_a.duckdb";
const DEFAULT_ENGINE_B_PATH: &str = "engine_b.duckdb";

#[derive(Parser)]
#[command(name = "flight-mirror")]
#[command(version)]
#[command(about = "Mirror synthetic flights across two SQL engines", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Engine A database file (literal dialect)
    #[arg(long, global = true)]
    pub engine_a: Option<PathBuf>,

    /// Engine B database file (parameterized dialect)
    #[arg(long, global = true)]
    pub engine_b: Option<PathBuf>,

    /// Lowest synthetic identifier number
    #[arg(long, global = true)]
    pub id_base: Option<u64>,
}

/// Which engines a command touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    A,
    B,
    Both,
}

impl Target {
    pub fn includes_a(self) -> bool {
        matches!(self, Target::A | Target::Both)
    }

    pub fn includes_b(self) -> bool {
        matches!(self, Target::B | Target::Both)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the warehouse schema in both engines
    Init,

    /// Load deterministic reference dimensions
    Seed {
        /// Scale preset: tiny, small, medium, large
        #[arg(short, long, default_value = "small")]
        scale: String,

        /// Random seed for reproducibility
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Engines to seed
        #[arg(long, value_enum, default_value = "both")]
        only: Target,
    },

    /// Generate flights and write them to both engines
    Generate {
        /// Number of flights
        #[arg(short = 'n', long, default_value = "1")]
        count: u64,

        /// One transaction per engine per batch instead of a saga per row
        #[arg(long)]
        batch: bool,

        /// Rows per batch (implies --batch)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Reference domain policy: union or intersection
        #[arg(long)]
        policy: Option<String>,

        /// Seed the row synthesizer for reproducible rows
        #[arg(long)]
        seed: Option<u64>,

        /// Show progress
        #[arg(short, long)]
        progress: bool,

        /// Include skipped identifiers and divergence diagnostics
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete the most recently generated flights from both engines
    Delete {
        /// Number of flights (default: all generated)
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// One IN-list delete per chunk instead of one per row
        #[arg(long)]
        chunked: bool,

        /// Identifiers per chunk (implies --chunked)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Show progress
        #[arg(short, long)]
        progress: bool,

        /// Include per-engine delete failures
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the highest generated identifier in each engine
    Max,

    /// Show the reference domain usable for new flights
    Refs {
        /// Reference domain policy: union or intersection
        #[arg(long)]
        policy: Option<String>,
    },

    /// Compare generated rows across the engines
    Check {
        /// Exit non-zero when the engines disagree
        #[arg(long)]
        fail_on_divergence: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli { global, command } = cli;
    match command {
        Commands::Init => init::run(&global),
        Commands::Seed { scale, seed, only } => seed::run(&global, scale, seed, only),
        Commands::Generate {
            count,
            batch,
            batch_size,
            policy,
            seed,
            progress,
            verbose,
        } => generate::run(
            &global, count, batch, batch_size, policy, seed, progress, verbose,
        ),
        Commands::Delete {
            count,
            chunked,
            chunk_size,
            progress,
            verbose,
        } => delete::run(&global, count, chunked, chunk_size, progress, verbose),
        Commands::Max => max::run(&global),
        Commands::Refs { policy } => refs::run(&global, policy),
        Commands::Check { fail_on_divergence } => check::run(&global, fail_on_divergence),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "flight-mirror",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

/// Defaults, then the YAML file, then environment, then flags
pub(crate) fn load_config(global: &GlobalArgs) -> anyhow::Result<MirrorConfig> {
    let mut config = match global.config {
        Some(ref path) => MirrorConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => MirrorConfig::default(),
    };
    config.apply_env()?;

    if let Some(ref path) = global.engine_a {
        config.engine_a.path = Some(path.clone());
    }
    if let Some(ref path) = global.engine_b {
        config.engine_b.path = Some(path.clone());
    }
    if let Some(base) = global.id_base {
        config.id_base = base;
    }
    if config.engine_a.path.is_none() {
        config.engine_a.path = Some(PathBuf::from(DEFAULT_ENGINE_A_PATH));
    }
    if config.engine_b.path.is_none() {
        config.engine_b.path = Some(PathBuf::from(DEFAULT_ENGINE_B_PATH));
    }

    config.validate()?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

pub(crate) fn parse_policy(
    policy: Option<String>,
    config: &MirrorConfig,
) -> anyhow::Result<DomainPolicy> {
    match policy {
        Some(p) => p.parse().map_err(|e: String| anyhow::anyhow!(e)),
        None => Ok(config.domain_policy),
    }
}

fn open_database(engine: &EngineConfig) -> anyhow::Result<DuckDatabase> {
    match engine.path {
        Some(ref path) => DuckDatabase::open(path),
        None => DuckDatabase::open_in_memory(),
    }
}

/// Both databases, opened for the length of one command
pub(crate) struct Engines {
    a: DuckDatabase,
    b: DuckDatabase,
    config: MirrorConfig,
}

impl Engines {
    pub fn open(config: MirrorConfig) -> anyhow::Result<Self> {
        Ok(Self {
            a: open_database(&config.engine_a)?,
            b: open_database(&config.engine_b)?,
            config,
        })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Fresh sessions for one invocation; released when dropped
    pub fn sessions(&self) -> anyhow::Result<(DuckSession, DuckSession)> {
        Ok((
            self.a.session(&label("engine-a", self.a.path()), self.config.engine_a.dialect)?,
            self.b.session(&label("engine-b", self.b.path()), self.config.engine_b.dialect)?,
        ))
    }
}

fn label(name: &str, path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("{} ({})", name, p.display()),
        None => name.to_string(),
    }
}

/// Count-based progress bar on stderr
pub(crate) fn progress_bar(total: u64, verb: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} flights {msg}",
    ) {
        pb.set_style(
            style
                .progress_chars("█▓▒░  ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
    }
    pb.set_message(verb.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

pub(crate) fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
