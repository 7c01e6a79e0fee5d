use std::collections::HashMap;

use rosterlink_core::{Table, Value};
use tracing::{info, warn};

use crate::canonical::{canonical_key, canonicalize};
use crate::config::{LinkConfig, SourceConfig};
use crate::error::ReconError;
use crate::matcher::link_with_report;
use crate::model::{ChainMeta, ChainReport, ChainResult, SourceReport, StepReport};

/// Raw tables keyed by source name, as loaded from each source's file.
#[derive(Debug, Clone, Default)]
pub struct ChainInput {
    pub tables: HashMap<String, Table>,
}

impl ChainInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, table: Table) {
        self.tables.insert(source.into(), table);
    }
}

/// Reduce a raw source table to `[name_<source>, group_key, link_key]`.
///
/// Each configured group column contributes one copy of the rows (stacked
/// in config order), so a fixture list with home and away teams yields one
/// row per player per team.
pub fn prepare_source(
    config: &LinkConfig,
    source: &SourceConfig,
    raw: &Table,
) -> Result<(Table, SourceReport), ReconError> {
    let name_field = source.name_field();
    let fields = [name_field.as_str(), config.group_key.as_str()];

    let mut stacked = Table::with_fields(fields)?;
    for group_column in source.group_column.columns() {
        let projected = raw.select(&[source.name_column.as_str(), group_column])?;
        stacked = stacked.concat(&Table::from_rows(fields, projected.rows().to_vec())?)?;
    }
    if source.dedupe {
        stacked = stacked.distinct();
    }

    let (prepared, aliases) = canonicalize(&stacked, &name_field, &config.link_key, &source.aliases)?;

    let report = SourceReport {
        name: source.name.clone(),
        rows_in: raw.len(),
        rows_prepared: prepared.len(),
        aliases,
    };
    Ok((prepared, report))
}

/// Recompute the link key of a linked table from the first non-null name
/// among `sources`, taken in chain order with that source's aliases applied.
/// Rows with no name at all get a null key.
pub fn rekey(config: &LinkConfig, sources: &[&SourceConfig], table: &Table) -> Result<Table, ReconError> {
    let name_fields: Vec<String> = sources.iter().map(|s| s.name_field()).collect();
    let columns = table.schema().resolve("linked", &name_fields)?;

    let keys = table
        .rows()
        .iter()
        .map(|row| {
            columns
                .iter()
                .zip(sources)
                .find_map(|(&col, source)| {
                    row[col]
                        .to_text()
                        .map(|name| canonical_key(source.aliases.resolve(&name)))
                })
                .map_or(Value::Null, Value::Str)
        })
        .collect();
    Ok(table.with_column(&config.link_key, keys)?)
}

/// Run the configured linkage chain.
///
/// The first two sources are linked pairwise, then every later source is
/// linked against the accumulated table, which is rekeyed after each step.
pub fn run(config: &LinkConfig, input: &ChainInput) -> Result<ChainResult, ReconError> {
    let threshold = config.threshold()?;

    let mut prepared = Vec::with_capacity(config.sources.len());
    let mut source_reports = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let raw = input
            .tables
            .get(&source.name)
            .ok_or_else(|| ReconError::MissingSource(source.name.clone()))?;
        let (table, report) = prepare_source(config, source, raw)?;
        info!(
            source = %source.name,
            rows_in = report.rows_in,
            rows_prepared = report.rows_prepared,
            "source prepared"
        );
        prepared.push((source, table));
        source_reports.push(report);
    }

    let mut prepared = prepared.into_iter();
    let Some((first, mut acc)) = prepared.next() else {
        return Err(ReconError::ConfigValidation("at least 2 sources are required".into()));
    };

    let mut seen = vec![first];
    let mut steps = Vec::new();
    for (source, table) in prepared {
        let outcome = link_with_report(
            &acc,
            &table,
            &config.group_key,
            &config.link_key,
            &config.link_key,
            threshold,
        )?;
        let left: Vec<String> = seen.iter().map(|s| s.name.clone()).collect();
        info!(
            left = %left.join("+"),
            right = %source.name,
            rows = outcome.table.len(),
            "link step complete"
        );
        steps.push(StepReport {
            left,
            right: source.name.clone(),
            summary: outcome.summary,
            fuzzy_matches: outcome.fuzzy_matches,
        });
        seen.push(source);
        acc = rekey(config, &seen, &outcome.table)?;
    }

    let before = acc.len();
    let required: Vec<String> = config
        .require
        .iter()
        .filter_map(|name| config.source(name).map(SourceConfig::name_field))
        .collect();
    let filtered = acc.filter(|record| {
        required
            .iter()
            .all(|field| record.get(field).is_some_and(|v| !v.is_null()))
    });
    let rows_dropped = before - filtered.len();
    if rows_dropped > 0 {
        warn!(
            dropped = rows_dropped,
            require = ?config.require,
            "rows missing a required source were dropped"
        );
    }

    let table = filtered.select(&config.output_columns())?;

    Ok(ChainResult {
        report: ChainReport {
            meta: ChainMeta {
                config_name: config.name.clone(),
                threshold: threshold.value(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            sources: source_reports,
            steps,
            rows_out: table.len(),
            rows_dropped,
        },
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
name = "test chain"
threshold = 80

[[sources]]
name = "rwc"
file = "rwc.csv"
name_column = "Player"
group_column = "Team"

[[sources]]
name = "espn"
file = "espn.csv"
name_column = "name"
group_column = "team"
"#;

    fn table(fields: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            fields.iter().copied(),
            rows.iter()
                .map(|r| r.iter().map(|v| Value::from(*v)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn input() -> ChainInput {
        let mut input = ChainInput::new();
        input.insert(
            "rwc",
            table(
                &["Player", "Team", "Caps"],
                &[
                    &["John Smith", "Wales", "12"],
                    &["Bob Jones", "Wales", "3"],
                    &["John Smith", "Wales", "12"],
                ],
            ),
        );
        input.insert(
            "espn",
            table(
                &["name", "team"],
                &[&["J Smyth", "Wales"], &["Siya Kolisi", "South Africa"]],
            ),
        );
        input
    }

    #[test]
    fn prepare_projects_dedupes_and_keys() {
        let config = LinkConfig::from_toml(CONFIG).unwrap();
        let input = input();
        let (prepared, report) =
            prepare_source(&config, &config.sources[0], &input.tables["rwc"]).unwrap();

        assert_eq!(prepared.fields(), ["name_rwc", "team", "name_link"]);
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared.value(0, "name_link"), Some(&Value::from("j. smith")));
        assert_eq!(report.rows_in, 3);
        assert_eq!(report.rows_prepared, 2);
    }

    #[test]
    fn prepare_stacks_group_columns() {
        let config = LinkConfig::from_toml(
            &CONFIG.replace("group_column = \"team\"", "group_column = [\"home\", \"away\"]"),
        )
        .unwrap();
        let raw = table(
            &["name", "home", "away"],
            &[&["Siya Kolisi", "South Africa", "Ireland"]],
        );
        let (prepared, _) = prepare_source(&config, &config.sources[1], &raw).unwrap();
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared.value(0, "team"), Some(&Value::from("South Africa")));
        assert_eq!(prepared.value(1, "team"), Some(&Value::from("Ireland")));
    }

    #[test]
    fn two_source_chain() {
        let config = LinkConfig::from_toml(CONFIG).unwrap();
        let result = run(&config, &input()).unwrap();

        assert_eq!(result.table.fields(), ["name_rwc", "name_espn", "team"]);
        // smith/smyth fuzzy pair, jones left-only, kolisi right-only
        assert_eq!(result.table.len(), 3);
        assert_eq!(result.table.value(0, "name_rwc"), Some(&Value::from("John Smith")));
        assert_eq!(result.table.value(0, "name_espn"), Some(&Value::from("J Smyth")));

        let step = &result.report.steps[0];
        assert_eq!(step.left, vec!["rwc".to_string()]);
        assert_eq!(step.right, "espn");
        assert_eq!(step.summary.fuzzy, 1);
        assert_eq!(result.report.rows_dropped, 0);
        assert_eq!(result.report.meta.threshold, 80.0);
    }

    #[test]
    fn require_filter_drops_partial_rows() {
        let config =
            LinkConfig::from_toml(&format!("require = [\"rwc\", \"espn\"]\n{CONFIG}")).unwrap();
        let result = run(&config, &input()).unwrap();
        assert_eq!(result.table.len(), 1);
        assert_eq!(result.report.rows_out, 1);
        assert_eq!(result.report.rows_dropped, 2);
    }

    #[test]
    fn rekey_prefers_first_source_name() {
        let mut config = LinkConfig::from_toml(CONFIG).unwrap();
        config.sources[1].aliases.insert("Siya Kolisi", "Siyamthanda Kolisi");
        let sources: Vec<&SourceConfig> = config.sources.iter().collect();
        let linked = Table::from_rows(
            ["name_rwc", "team", "name_link", "name_espn"],
            vec![
                vec!["John Smith".into(), "Wales".into(), "j. smyth".into(), "J Smyth".into()],
                vec![Value::Null, "South Africa".into(), "x".into(), "Siya Kolisi".into()],
                vec![Value::Null, "Wales".into(), "y".into(), Value::Null],
            ],
        )
        .unwrap();

        let out = rekey(&config, &sources, &linked).unwrap();
        assert_eq!(out.fields(), linked.fields());
        assert_eq!(out.value(0, "name_link"), Some(&Value::from("j. smith")));
        assert_eq!(out.value(1, "name_link"), Some(&Value::from("s. kolisi")));
        assert_eq!(out.value(2, "name_link"), Some(&Value::Null));
    }

    #[test]
    fn three_source_chain_links_against_accumulated_table() {
        let config = LinkConfig::from_toml(&format!(
            "{CONFIG}\n[[sources]]\nname = \"wiki\"\nfile = \"wiki.csv\"\nname_column = \"motm\"\ngroup_column = [\"home\", \"away\"]\n"
        ))
        .unwrap();
        let mut input = input();
        input.insert(
            "wiki",
            table(
                &["motm", "home", "away"],
                &[&["Siya Kolisi", "South Africa", "Scotland"]],
            ),
        );
        let result = run(&config, &input).unwrap();

        assert_eq!(result.report.steps.len(), 2);
        assert_eq!(result.report.steps[1].left, vec!["rwc".to_string(), "espn".to_string()]);
        // kolisi (espn only) matches wiki exactly on the espn-derived key
        assert_eq!(result.report.steps[1].summary.exact, 1);
        assert_eq!(result.table.fields(), ["name_rwc", "name_espn", "name_wiki", "team"]);
        // 3 rows from step one plus the Scotland copy of the wiki row
        assert_eq!(result.table.len(), 4);
    }

    #[test]
    fn missing_source_table() {
        let config = LinkConfig::from_toml(CONFIG).unwrap();
        let mut input = input();
        input.tables.remove("espn");
        let err = run(&config, &input).unwrap_err();
        assert!(matches!(err, ReconError::MissingSource(ref s) if s == "espn"));
    }

    #[test]
    fn unknown_select_column_is_a_schema_error() {
        let config =
            LinkConfig::from_toml(&format!("select = [\"name_rwc\", \"caps\"]\n{CONFIG}")).unwrap();
        let err = run(&config, &input()).unwrap_err();
        assert!(matches!(err, ReconError::Schema(_)));
    }
}
