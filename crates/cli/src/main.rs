// rosterlink CLI - join and link entity tables from CSV files

mod exit_codes;
mod link;
mod logging;
mod table_ops;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rosterlink_core::SchemaError;
use rosterlink_io::IoError;
use rosterlink_recon::ReconError;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_ERROR, EXIT_SCHEMA, EXIT_SUCCESS};
use link::LinkCommands;
use logging::{init_logging, LogConfig};

#[derive(Parser)]
#[command(name = "rosterlink")]
#[command(about = "Join tables and reconcile player identities across sources")]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link entity tables from several sources (config-driven)
    #[command(subcommand)]
    Link(LinkCommands),

    /// Join two CSV files on key columns
    #[command(after_help = "\
Examples:
  rosterlink join players.csv stats.csv --on id
  rosterlink join players.csv stats.csv --on team,name --right-on club,player --mode inner
  rosterlink join a.csv b.csv --on id --mode left-only -o missing.csv")]
    Join {
        /// Left input CSV
        left: PathBuf,

        /// Right input CSV
        right: PathBuf,

        /// Left key columns (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        on: Vec<String>,

        /// Right key columns (defaults to --on)
        #[arg(long, value_delimiter = ',')]
        right_on: Option<Vec<String>>,

        /// inner, left-only, right-only, left-outer, right-outer or full-outer
        #[arg(long, default_value = "full-outer")]
        mode: String,

        /// Output CSV (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Parse numbers and dates so keys compare by value
        #[arg(long)]
        infer_types: bool,
    },

    /// Add a canonical name key column to a CSV file
    #[command(after_help = "\
Examples:
  rosterlink canon players.csv --name-column Player
  rosterlink canon players.csv --name-column Player --aliases aliases.toml -o keyed.csv")]
    Canon {
        /// Input CSV
        input: PathBuf,

        /// Column holding the names
        #[arg(long)]
        name_column: String,

        /// Column to write the key into
        #[arg(long, default_value = "name_link")]
        key_column: String,

        /// TOML file of "name" = "replacement" overrides
        #[arg(long)]
        aliases: Option<PathBuf>,

        /// Output CSV (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&LogConfig::from_verbosity(cli.verbose, cli.quiet)) {
        eprintln!("warning: logging disabled: {e}");
    }

    let result = match cli.command {
        Commands::Link(cmd) => link::cmd_link(cmd),
        Commands::Join {
            left,
            right,
            on,
            right_on,
            mode,
            output,
            infer_types,
        } => table_ops::cmd_join(left, right, on, right_on, mode, output, infer_types),
        Commands::Canon {
            input,
            name_column,
            key_column,
            aliases,
            output,
        } => table_ops::cmd_canon(input, name_column, key_column, aliases, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::Schema(e) if !e.fields().is_empty() => {
                Some(format!("check column names: {}", e.fields().join(", ")))
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<SchemaError> for CliError {
    fn from(err: SchemaError) -> Self {
        Self { code: EXIT_SCHEMA, message: err.to_string(), hint: None }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        Self { code: io_exit_code(&err), message: err.to_string(), hint: None }
    }
}
