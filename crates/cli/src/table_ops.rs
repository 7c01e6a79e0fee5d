//! `rosterlink join` and `rosterlink canon`: single-table operations on CSV files.

use std::path::{Path, PathBuf};

use rosterlink_core::Table;
use rosterlink_io::{read_table, write_table, write_table_to_string, CsvOptions};
use rosterlink_recon::{canonicalize, join, AliasMap, JoinMode};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_IO};
use crate::CliError;

fn csv_options(infer_types: bool) -> CsvOptions {
    CsvOptions {
        infer_types,
        ..CsvOptions::default()
    }
}

/// Write to `output`, or to stdout when absent.
fn emit(table: &Table, output: Option<&Path>, options: &CsvOptions) -> Result<(), CliError> {
    match output {
        Some(path) => {
            write_table(table, path, options)?;
            eprintln!("wrote {} rows to {}", table.len(), path.display());
        }
        None => print!("{}", write_table_to_string(table, options)?),
    }
    Ok(())
}

pub fn cmd_join(
    left: PathBuf,
    right: PathBuf,
    on: Vec<String>,
    right_on: Option<Vec<String>>,
    mode: String,
    output: Option<PathBuf>,
    infer_types: bool,
) -> Result<(), CliError> {
    let mode: JoinMode = mode.parse().map_err(rosterlink_recon::ReconError::from)?;
    let options = csv_options(infer_types);

    let left_table = read_table(&left, &options)?;
    let right_table = read_table(&right, &options)?;
    let right_on = right_on.unwrap_or_else(|| on.clone());

    let joined = join(&left_table, &on, &right_table, &right_on, mode)?;
    emit(&joined, output.as_deref(), &options)
}

pub fn cmd_canon(
    input: PathBuf,
    name_column: String,
    key_column: String,
    aliases: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let aliases = match aliases {
        Some(path) => load_aliases(&path)?,
        None => AliasMap::new(),
    };
    let options = CsvOptions::default();

    let table = read_table(&input, &options)?;
    let (keyed, report) = canonicalize(&table, &name_column, &key_column, &aliases)?;

    if !aliases.is_empty() {
        eprintln!(
            "aliases: {} of {} applied{}",
            report.applied,
            report.expected,
            if report.unused.is_empty() {
                String::new()
            } else {
                format!(" (unused: {})", report.unused.join(", "))
            },
        );
    }

    emit(&keyed, output.as_deref(), &options)
}

/// A flat TOML table of `"Name As Listed" = "Name To Use"` entries.
fn load_aliases(path: &Path) -> Result<AliasMap, CliError> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_IO,
        message: format!("cannot read aliases {}: {e}", path.display()),
        hint: None,
    })?;
    toml::from_str(&content).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("invalid aliases file {}: {e}", path.display()),
        hint: Some("expected lines like \"Guido Petti Pagadizabal\" = \"G. Petti\"".into()),
    })
}
