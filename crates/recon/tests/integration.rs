use std::path::PathBuf;

use rosterlink_core::{Table, Value};
use rosterlink_io::{read_table, write_table_to_string, CsvOptions};
use rosterlink_recon::config::LinkConfig;
use rosterlink_recon::engine::{run, ChainInput};
use rosterlink_recon::{canonicalize, join, link_with_report, AliasMap, JoinMode, MatchThreshold};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_config(file: &str) -> LinkConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join(file)).unwrap();
    LinkConfig::from_toml(&toml).unwrap()
}

fn load_input(config: &LinkConfig) -> ChainInput {
    let mut input = ChainInput::new();
    for source in &config.sources {
        let path = fixtures_dir().join(&source.file);
        let table = read_table(&path, &CsvOptions::default())
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
        input.insert(source.name.clone(), table);
    }
    input
}

fn load_fixture(file: &str) -> Table {
    read_table(&fixtures_dir().join(file), &CsvOptions::default()).unwrap()
}

fn names(table: &Table, field: &str) -> Vec<Option<String>> {
    table
        .column(field)
        .unwrap()
        .into_iter()
        .map(|v| v.to_text())
        .collect()
}

// -------------------------------------------------------------------------
// Three-source chain
// -------------------------------------------------------------------------

#[test]
fn chain_sources_are_prepared() {
    let config = load_config("rwc2023.link.toml");
    let result = run(&config, &load_input(&config)).unwrap();

    let rwc = &result.report.sources[0];
    assert_eq!(rwc.rows_in, 8);
    // duplicate Kolisi row removed
    assert_eq!(rwc.rows_prepared, 7);
    assert!(rwc.aliases.is_consistent());
    assert_eq!(rwc.aliases.applied, 1);

    // home and away copies of every wiki row
    let wiki = &result.report.sources[2];
    assert_eq!(wiki.rows_in, 4);
    assert_eq!(wiki.rows_prepared, 8);
}

#[test]
fn chain_step_summaries() {
    let config = load_config("rwc2023.link.toml");
    let result = run(&config, &load_input(&config)).unwrap();
    assert_eq!(result.report.steps.len(), 2);

    let first = &result.report.steps[0];
    assert_eq!(first.right, "espn");
    assert_eq!(first.summary.exact, 5);
    assert_eq!(first.summary.fuzzy, 1);
    assert_eq!(first.summary.left_only, 1);
    assert_eq!(first.summary.right_only, 1);
    assert_eq!(first.fuzzy_matches[0].left_name, "c. kolbe");
    assert_eq!(first.fuzzy_matches[0].right_name, "c. kolbie");

    let second = &result.report.steps[1];
    assert_eq!(second.left, vec!["rwc".to_string(), "espn".to_string()]);
    assert_eq!(second.summary.exact, 3);
    assert_eq!(second.summary.fuzzy, 1);
    assert_eq!(second.summary.left_only, 4);
    assert_eq!(second.summary.right_only, 4);
    // espn-only row keyed from the espn name, then fuzzy-matched by wiki
    assert_eq!(second.fuzzy_matches[0].left_name, "l. rees-zammit");
    assert_eq!(second.fuzzy_matches[0].right_name, "l. rees zammit");
    assert!(second.fuzzy_matches[0].score > 90.0);
}

#[test]
fn chain_output_keeps_required_sources() {
    let config = load_config("rwc2023.link.toml");
    let result = run(&config, &load_input(&config)).unwrap();
    let table = &result.table;

    assert_eq!(table.fields(), ["name_rwc", "name_espn", "name_wiki", "team"]);
    assert_eq!(result.report.rows_out, 6);
    assert_eq!(result.report.rows_dropped, 6);

    assert_eq!(
        names(table, "name_rwc"),
        vec![
            Some("Pablo Matera".into()),
            Some("Siya Kolisi".into()),
            Some("Dan Biggar".into()),
            Some("Guido Petti Pagadizabal".into()),
            Some("Handré Pollard".into()),
            Some("Cheslin Kolbe".into()),
        ]
    );
    assert_eq!(table.value(3, "name_espn"), Some(&Value::from("Guido Petti")));
    assert_eq!(table.value(5, "name_espn"), Some(&Value::from("Cheslin Kolbie")));
    assert_eq!(table.value(1, "name_wiki"), Some(&Value::from("Siya Kolisi")));
    assert_eq!(table.value(3, "name_wiki"), Some(&Value::Null));
}

#[test]
fn chain_without_require_keeps_every_row() {
    let toml = std::fs::read_to_string(fixtures_dir().join("rwc2023.link.toml"))
        .unwrap()
        .replace("require = [\"rwc\", \"espn\"]\n", "");
    let config = LinkConfig::from_toml(&toml).unwrap();
    let result = run(&config, &load_input(&config)).unwrap();

    assert_eq!(result.table.len(), 12);
    assert_eq!(result.report.rows_dropped, 0);
}

#[test]
fn chain_is_deterministic() {
    let config = load_config("rwc2023.link.toml");
    let a = run(&config, &load_input(&config)).unwrap();
    let b = run(&config, &load_input(&config)).unwrap();
    let options = CsvOptions::default();
    assert_eq!(
        write_table_to_string(&a.table, &options).unwrap(),
        write_table_to_string(&b.table, &options).unwrap()
    );
}

#[test]
fn chain_report_serializes() {
    let config = load_config("rwc2023.link.toml");
    let result = run(&config, &load_input(&config)).unwrap();
    let json = serde_json::to_value(&result.report).unwrap();
    assert_eq!(json["meta"]["config_name"], "RWC 2023 player lookup");
    assert_eq!(json["meta"]["threshold"], 90.0);
    assert_eq!(json["steps"][0]["summary"]["exact"], 5);
    assert_eq!(json["sources"][0]["aliases"]["unused"], serde_json::json!([]));
}

// -------------------------------------------------------------------------
// Pairwise operations on fixture data
// -------------------------------------------------------------------------

#[test]
fn pairwise_link_matches_join_partition() {
    let aliases: AliasMap = [("Guido Petti Pagadizabal", "G. Petti")].into_iter().collect();
    let (rwc, _) = canonicalize(
        &load_fixture("rwc.csv").select(&["Player", "Team"]).unwrap().rename("Team", "team").unwrap(),
        "Player",
        "key",
        &aliases,
    )
    .unwrap();
    let (espn, _) = canonicalize(&load_fixture("espn.csv"), "name", "key", &AliasMap::new()).unwrap();

    let keys = ["team", "key"];
    let inner = join(&rwc, &keys, &espn, &keys, JoinMode::Inner).unwrap();
    let left_only = join(&rwc, &keys, &espn, &keys, JoinMode::LeftOnly).unwrap();
    let right_only = join(&rwc, &keys, &espn, &keys, JoinMode::RightOnly).unwrap();

    // Threshold 100 can never be exceeded: link degenerates to the exact partition
    let outcome = link_with_report(&rwc, &espn, "team", "key", "key", MatchThreshold::new(100.0).unwrap()).unwrap();
    assert_eq!(outcome.summary.fuzzy, 0);
    // the duplicate Kolisi row joins twice
    assert_eq!(outcome.summary.exact, inner.len());
    assert_eq!(outcome.summary.left_only, left_only.len());
    assert_eq!(outcome.summary.right_only, right_only.len());

    let full = join(&rwc, &keys, &espn, &keys, JoinMode::FullOuter).unwrap();
    assert_eq!(outcome.table.sorted_records(), full.sorted_records());
}
