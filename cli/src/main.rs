//! # oneview-cli
//!
//! Command-line driver for compiling Oneview view templates into TypeScript
//! view modules and per-context registries.
//!
//! ## Installation
//!
//! ```bash
//! cargo install oneview-cli
//! ```
//!
//! ## Commands
//!
//! - `ov init` - Create `oneview.toml` from the view directories found
//! - `ov compile [context|all]` - Compile views (`--watch` to keep going)
//! - `ov list` - List contexts and the views they compile
//! - `ov config validate` - Check the configuration file
//!
//! See `ov --help` for the full command reference.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod ui;

#[derive(Parser)]
#[command(name = "ov")]
#[command(about = "Oneview CLI - Compile view templates into TypeScript modules", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to oneview.toml configuration file
    #[arg(short, long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: String,

    /// Output as JSON (machine-readable format)
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Oneview project (auto-detects view directories)
    Init,

    /// Compile view templates of one context, or all of them
    Compile {
        /// Context to compile (`all` or omitted compiles every context)
        context: Option<String>,

        /// Keep running and recompile views as they change
        #[arg(short, long)]
        watch: bool,

        /// Recompile everything and clean stale output first
        #[arg(short, long)]
        force: bool,

        /// Collapse whitespace in compiled templates
        #[arg(long)]
        minify: bool,

        /// Write a position map next to every compiled module
        #[arg(long)]
        sourcemap: bool,
    },

    /// List configured contexts and their views
    List,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate the configuration file
    Validate,
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "ov", &mut io::stdout());
        return;
    }

    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        eprintln!("{} {}", "warning:".yellow(), err);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Init => commands::init::init(&cli.config),
        Commands::Compile {
            context,
            watch,
            force,
            minify,
            sourcemap,
        } => commands::compile::compile(
            &cli.config,
            context.as_deref(),
            commands::compile::CompileArgs {
                watch,
                force,
                minify,
                sourcemap,
            },
            cli.json,
        ),
        Commands::List => commands::list::list(&cli.config, cli.json),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Validate => commands::config::validate(&cli.config, cli.json),
        },
    }
}
