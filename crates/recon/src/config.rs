use std::collections::HashSet;

use serde::Deserialize;

use crate::canonical::AliasMap;
use crate::error::ReconError;
use crate::similarity::MatchThreshold;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A multi-source linkage pipeline, usually read from a `*.link.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub name: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Name of the blocking column in every prepared source.
    #[serde(default = "default_group_key")]
    pub group_key: String,
    /// Name of the canonical name-key column in every prepared source.
    #[serde(default = "default_link_key")]
    pub link_key: String,
    /// Output CSV path, relative to the config file.
    #[serde(default)]
    pub output: Option<String>,
    /// Sources that must be present in every output row.
    #[serde(default)]
    pub require: Vec<String>,
    /// Output columns. Defaults to every source's name column plus the group key.
    #[serde(default)]
    pub select: Option<Vec<String>>,
    /// Linked in order: the first two pairwise, then each later one against the result.
    pub sources: Vec<SourceConfig>,
}

fn default_threshold() -> f64 {
    MatchThreshold::DEFAULT.value()
}

fn default_group_key() -> String {
    "team".into()
}

fn default_link_key() -> String {
    "name_link".into()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub file: String,
    pub name_column: String,
    pub group_column: GroupColumns,
    #[serde(default = "default_true")]
    pub dedupe: bool,
    #[serde(default)]
    pub aliases: AliasMap,
}

impl SourceConfig {
    /// Column holding this source's original name after preparation.
    pub fn name_field(&self) -> String {
        format!("name_{}", self.name)
    }
}

/// One group column, or several whose rows are stacked (e.g. home and away team).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GroupColumns {
    One(String),
    Many(Vec<String>),
}

impl GroupColumns {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::One(c) => vec![c.as_str()],
            Self::Many(cs) => cs.iter().map(String::as_str).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: LinkConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn threshold(&self) -> Result<MatchThreshold, ReconError> {
        Ok(MatchThreshold::new(self.threshold)?)
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Output columns after the chain runs.
    pub fn output_columns(&self) -> Vec<String> {
        match &self.select {
            Some(cols) => cols.clone(),
            None => self
                .sources
                .iter()
                .map(SourceConfig::name_field)
                .chain(std::iter::once(self.group_key.clone()))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.threshold()?;

        if self.sources.len() < 2 {
            return Err(ReconError::ConfigValidation(
                "at least 2 sources are required".into(),
            ));
        }

        if self.group_key.is_empty() || self.link_key.is_empty() {
            return Err(ReconError::ConfigValidation(
                "group_key and link_key must not be empty".into(),
            ));
        }
        if self.group_key == self.link_key {
            return Err(ReconError::ConfigValidation(format!(
                "group_key and link_key are both '{}'",
                self.group_key
            )));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.is_empty() {
                return Err(ReconError::ConfigValidation("source name must not be empty".into()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate source '{}'",
                    source.name
                )));
            }
            if source.file.is_empty() || source.name_column.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': file and name_column must not be empty",
                    source.name
                )));
            }

            let groups = source.group_column.columns();
            if groups.is_empty() || groups.iter().any(|g| g.is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': group_column must name at least one column",
                    source.name
                )));
            }
            if groups.contains(&source.name_column.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': name_column '{}' is also a group column",
                    source.name, source.name_column
                )));
            }

            let field = source.name_field();
            if field == self.group_key || field == self.link_key {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': prepared column '{field}' clashes with group_key/link_key",
                    source.name
                )));
            }
        }

        for required in &self.require {
            if !names.contains(required.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "require: unknown source '{required}'"
                )));
            }
        }

        if let Some(select) = &self.select {
            if select.is_empty() || select.iter().any(|c| c.is_empty()) {
                return Err(ReconError::ConfigValidation(
                    "select must list at least one non-empty column".into(),
                ));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;

    const VALID: &str = r#"
name = "RWC lookup"
threshold = 85
require = ["rwc", "espn"]

[[sources]]
name = "rwc"
file = "rwc.csv"
name_column = "Player"
group_column = "Team"
[sources.aliases]
"Guido Petti Pagadizabal" = "G. Petti"
"David Wallis" = "D. Carvalho"

[[sources]]
name = "espn"
file = "espn.csv"
name_column = "name"
group_column = "team"
dedupe = false

[[sources]]
name = "wiki"
file = "wiki.csv"
name_column = "motm"
group_column = ["team_home", "team_away"]
"#;

    #[test]
    fn parse_valid() {
        let config = LinkConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "RWC lookup");
        assert_eq!(config.threshold().unwrap().value(), 85.0);
        assert_eq!(config.group_key, "team");
        assert_eq!(config.link_key, "name_link");
        assert_eq!(config.sources.len(), 3);
        assert!(config.output.is_none());

        let rwc = config.source("rwc").unwrap();
        assert!(rwc.dedupe);
        assert_eq!(rwc.aliases.len(), 2);
        assert_eq!(rwc.aliases.resolve("David Wallis"), "D. Carvalho");
        assert_eq!(rwc.name_field(), "name_rwc");

        assert!(!config.source("espn").unwrap().dedupe);
        assert_eq!(
            config.source("wiki").unwrap().group_column.columns(),
            vec!["team_home", "team_away"]
        );
        assert_eq!(
            config.output_columns(),
            vec!["name_rwc", "name_espn", "name_wiki", "team"]
        );
    }

    #[test]
    fn threshold_defaults_to_90() {
        let input = VALID.replace("threshold = 85\n", "");
        let config = LinkConfig::from_toml(&input).unwrap();
        assert_eq!(config.threshold().unwrap(), MatchThreshold::DEFAULT);
    }

    #[test]
    fn reject_out_of_range_threshold() {
        let input = VALID.replace("threshold = 85", "threshold = 0");
        let err = LinkConfig::from_toml(&input).unwrap_err();
        assert!(matches!(
            err,
            ReconError::Configuration(ConfigurationError::ThresholdOutOfRange(_))
        ));
    }

    #[test]
    fn reject_single_source() {
        let input = r#"
name = "Solo"
[[sources]]
name = "rwc"
file = "rwc.csv"
name_column = "Player"
group_column = "Team"
"#;
        let err = LinkConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("at least 2 sources"));
    }

    #[test]
    fn reject_duplicate_source() {
        let input = VALID.replace("name = \"wiki\"", "name = \"espn\"");
        let err = LinkConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("duplicate source 'espn'"));
    }

    #[test]
    fn reject_unknown_required_source() {
        let input = VALID.replace("require = [\"rwc\", \"espn\"]", "require = [\"fantasy\"]");
        let err = LinkConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("'fantasy'"));
    }

    #[test]
    fn reject_name_column_as_group() {
        let input = VALID.replace("group_column = \"team\"", "group_column = \"name\"");
        let err = LinkConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("also a group column"));
    }

    #[test]
    fn reject_missing_sources_table() {
        let err = LinkConfig::from_toml("name = \"x\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn explicit_select_wins() {
        let input = VALID.replace(
            "require = [\"rwc\", \"espn\"]",
            "select = [\"name_rwc\", \"team\"]",
        );
        let config = LinkConfig::from_toml(&input).unwrap();
        assert_eq!(config.output_columns(), vec!["name_rwc", "team"]);
    }
}
