//! `rosterlink link`: config-driven multi-source record linkage.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use rosterlink_io::{read_table, write_table, write_table_to_string, CsvOptions};
use rosterlink_recon::engine::{run, ChainInput};
use rosterlink_recon::{ChainReport, LinkConfig};
use tracing::info;

use crate::exit_codes::{EXIT_IO, EXIT_REQUIRED_DROPPED};
use crate::CliError;

#[derive(Subcommand)]
pub enum LinkCommands {
    /// Run a linkage pipeline from a TOML config file
    #[command(after_help = "\
Examples:
  rosterlink link run rwc2023.link.toml
  rosterlink link run rwc2023.link.toml --output lookup.csv
  rosterlink link run rwc2023.link.toml --json --strict")]
    Run {
        /// Path to the .link.toml config file
        config: PathBuf,

        /// Write the linked table here (overrides the config's `output`)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the run report as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Fail if the required-source filter dropped any row
        #[arg(long)]
        strict: bool,
    },

    /// Validate a linkage config without running
    #[command(after_help = "\
Examples:
  rosterlink link validate rwc2023.link.toml")]
    Validate {
        /// Path to the .link.toml config file
        config: PathBuf,
    },
}

pub fn cmd_link(cmd: LinkCommands) -> Result<(), CliError> {
    match cmd {
        LinkCommands::Run { config, output, json, strict } => cmd_link_run(config, output, json, strict),
        LinkCommands::Validate { config } => cmd_link_validate(config),
    }
}

fn load_config(config_path: &Path) -> Result<LinkConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| CliError {
        code: EXIT_IO,
        message: format!("cannot read config {}: {e}", config_path.display()),
        hint: None,
    })?;
    Ok(LinkConfig::from_toml(&config_str)?)
}

/// Source files and `output` resolve against the config file's directory.
fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn cmd_link_run(
    config_path: PathBuf,
    output: Option<PathBuf>,
    json_output: bool,
    strict: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = base_dir(&config_path);

    let options = CsvOptions::default();
    let mut input = ChainInput::new();
    for source in &config.sources {
        let path = base_dir.join(&source.file);
        let table = read_table(&path, &options)?;
        info!(source = %source.name, rows = table.len(), path = %path.display(), "loaded");
        input.insert(source.name.clone(), table);
    }

    let result = run(&config, &input)?;

    let output_path = output.or_else(|| config.output.as_ref().map(|o| base_dir.join(o)));
    match &output_path {
        Some(path) => {
            write_table(&result.table, path, &options)?;
            eprintln!("wrote {}", path.display());
        }
        // stdout carries the JSON report instead
        None if json_output => {}
        None => print!("{}", write_table_to_string(&result.table, &options)?),
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&result.report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&result.report);

    if strict && result.report.rows_dropped > 0 {
        return Err(CliError {
            code: EXIT_REQUIRED_DROPPED,
            message: format!(
                "{} row(s) dropped for missing a required source ({})",
                result.report.rows_dropped,
                config.require.join(", ")
            ),
            hint: Some("add aliases for the unmatched names or lower the threshold".into()),
        });
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &ChainReport) {
    for step in &report.steps {
        let s = &step.summary;
        eprintln!(
            "{} <- {}: {} exact, {} fuzzy, {} left only, {} right only",
            step.left.join("+"),
            step.right,
            s.exact,
            s.fuzzy,
            s.left_only,
            s.right_only,
        );
    }
    for source in &report.sources {
        if !source.aliases.is_consistent() {
            eprintln!(
                "aliases for '{}': {} of {} applied (unused: {})",
                source.name,
                source.aliases.applied,
                source.aliases.expected,
                source.aliases.unused.join(", "),
            );
        }
    }
    eprintln!(
        "'{}': {} rows out, {} dropped by require filter",
        report.meta.config_name, report.rows_out, report.rows_dropped,
    );
}

fn cmd_link_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = base_dir(&config_path);

    let missing: Vec<String> = config
        .sources
        .iter()
        .map(|s| base_dir.join(&s.file))
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect();

    eprintln!(
        "'{}': {} sources, threshold {}, output columns [{}]",
        config.name,
        config.sources.len(),
        config.threshold,
        config.output_columns().join(", "),
    );

    if !missing.is_empty() {
        return Err(CliError {
            code: EXIT_IO,
            message: format!("source file(s) not found: {}", missing.join(", ")),
            hint: None,
        });
    }
    eprintln!("ok");
    Ok(())
}
