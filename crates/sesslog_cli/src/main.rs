//! sesslog-hook CLI - stdin-to-log bridge for coding-agent runtimes.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sesslog_core::{Overrides, TimestampMode};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "sesslog-hook")]
#[command(about = "Session-scoped command logging for coding-agent runtimes", long_about = None)]
#[command(version)]
struct Cli {
    /// Log root directory (default: $SESSLOG_ROOT, else ~/.sesslog)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one event from stdin, log it, acknowledge (the default)
    Hook(HookArgs),
    /// Rename a session; its logs follow on the next event
    Rename {
        /// Session id to rename
        session_id: String,
        /// New human-readable name
        new_name: String,
    },
}

#[derive(Args, Default)]
struct HookArgs {
    /// Override verbosity (0-4)
    #[arg(long)]
    verbosity: Option<u8>,

    /// Override timestamp mode (full, date, none)
    #[arg(long)]
    timestamps: Option<TimestampMode>,

    /// Override working-directory display
    #[arg(long)]
    pwd: Option<bool>,

    /// Category allow-list (comma-separated, e.g. bash,io)
    #[arg(long, value_delimiter = ',')]
    filter: Vec<String>,
}

impl HookArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            verbosity: self.verbosity,
            timestamp_mode: self.timestamps,
            pwd_enabled: self.pwd,
            filter_include: (!self.filter.is_empty()).then(|| self.filter.clone()),
        }
    }
}

/// Log root precedence: flag, environment, home directory fallback.
fn resolve_root(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("SESSLOG_ROOT").map(PathBuf::from))
        .unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".sesslog")
        })
}

fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries only the acknowledgment
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = resolve_root(cli.root);

    match cli.command {
        Some(Commands::Rename {
            session_id,
            new_name,
        }) => commands::rename::run(&root, &session_id, &new_name),
        Some(Commands::Hook(args)) => commands::hook::run(&root, &args.overrides()),
        None => commands::hook::run(&root, &HookArgs::default().overrides()),
    }
}
