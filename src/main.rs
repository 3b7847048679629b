mod cache;
mod config;
mod engine;
mod exec_index;
mod lexer;
mod paths;
mod probe;
mod registry;
mod scrape;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tabkit",
    version,
    about = "Help-probing tab completion engine for interactive shells",
    long_about = "Completes paths, built-in commands and their flags, and infers flag and \
subcommand completions for arbitrary external executables by probing them with generic help \
switches and scraping the output."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Complete the word under the cursor of a command line
    Complete {
        /// The command line buffer
        buffer: String,

        /// Cursor byte offset (defaults to the end of the buffer)
        #[arg(short, long)]
        cursor: Option<usize>,

        /// Working directory for path lookups and probes
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "plain")]
        format: engine::OutputFormat,
    },

    /// Probe an external command and show the extracted metadata
    Probe {
        /// Command name or path to probe
        command: String,

        /// Subcommand prefix to probe contextually
        #[arg(trailing_var_arg = true)]
        prefix: Vec<String>,

        /// Working directory for the probe
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "plain")]
        format: engine::OutputFormat,
    },

    /// Complete a filesystem path fragment
    Path {
        /// The (possibly quoted or escaped) fragment
        fragment: String,

        /// Working directory the fragment is relative to
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// List executables visible on the search path
    Exes {
        /// Only show names starting with this prefix
        prefix: Option<String>,
    },

    /// Show the effective configuration
    ConfigShow,
}

fn working_dir(cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("cannot determine working directory"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Complete {
            buffer,
            cursor,
            cwd,
            format,
        } => {
            let dir = working_dir(cwd)?;
            engine::run_complete(&buffer, cursor, &dir, format, cli.verbose)?;
        }

        Commands::Probe {
            command,
            prefix,
            cwd,
            format,
        } => {
            let dir = working_dir(cwd)?;
            engine::run_probe(&command, &prefix, &dir, format, cli.verbose)?;
        }

        Commands::Path { fragment, cwd } => {
            let dir = working_dir(cwd)?;
            paths::run(&fragment, &dir, cli.verbose)?;
        }

        Commands::Exes { prefix } => {
            exec_index::run(prefix.as_deref(), cli.verbose)?;
        }

        Commands::ConfigShow => {
            config::show_config()?;
        }
    }

    Ok(())
}
