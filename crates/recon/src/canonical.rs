//! Name canonicalisation: manual alias overrides, then a comparable key.
//!
//! `"Juan Manuel Rodríguez"` becomes `"j. manuel rodriguez"`: diacritics
//! stripped, first token reduced to its initial, lower-cased.

use std::collections::{BTreeMap, BTreeSet};

use rosterlink_core::{SchemaError, Table, Value};
use serde::{Deserialize, Serialize};
use tracing::warn;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Literal name → name overrides, applied before canonicalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasMap(BTreeMap<String, String>);

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The override for `name`, or `name` itself.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map(String::as_str).unwrap_or(name)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// How an alias map fared against one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasReport {
    /// Entries in the map.
    pub expected: usize,
    /// Rows rewritten by an entry.
    pub applied: usize,
    /// Entries that matched no row.
    pub unused: Vec<String>,
}

impl AliasReport {
    pub fn is_consistent(&self) -> bool {
        self.expected == self.applied
    }
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Letters with no Unicode decomposition to plain ASCII.
fn transliterate(c: char) -> Option<&'static str> {
    Some(match c {
        'ø' => "o",
        'Ø' => "O",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ß' => "ss",
        'ł' => "l",
        'Ł' => "L",
        'đ' | 'ð' => "d",
        'Đ' | 'Ð' => "D",
        'þ' => "th",
        'Þ' => "Th",
        'ı' => "i",
        '\u{2019}' | '\u{2018}' => "'",
        _ => return None,
    })
}

/// Strip diacritics and map the remaining non-decomposable letters.
pub fn fold_diacritics(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
        match transliterate(c) {
            Some(s) => out.push_str(s),
            None => out.push(c),
        }
    }
    out
}

/// Canonical comparison key for a person's name.
///
/// First initial, `". "`, the remaining tokens joined by single spaces,
/// all lower-case. A single-token name keeps only its initial (`"p."`).
pub fn canonical_key(name: &str) -> String {
    let folded = fold_diacritics(name);
    let mut tokens = folded.split_whitespace();
    let Some(first) = tokens.next() else {
        return String::new();
    };
    let initial: String = first.chars().take(1).collect();
    let rest: Vec<&str> = tokens.collect();
    format!("{initial}. {}", rest.join(" "))
        .trim_end()
        .to_lowercase()
}

/// Add (or replace) `key_field` with the canonical key of `name_field`,
/// after applying `aliases`. Null names produce null keys.
pub fn canonicalize(
    table: &Table,
    name_field: &str,
    key_field: &str,
    aliases: &AliasMap,
) -> Result<(Table, AliasReport), SchemaError> {
    let names = table.column(name_field)?;

    let mut hit: BTreeSet<&str> = BTreeSet::new();
    let mut applied = 0;
    let keys: Vec<Value> = names
        .iter()
        .map(|v| match v.to_text() {
            None => Value::Null,
            Some(raw) => {
                let resolved = aliases.resolve(&raw);
                if let Some((from, _)) = aliases.0.get_key_value(raw.as_str()) {
                    hit.insert(from.as_str());
                    applied += 1;
                }
                Value::Str(canonical_key(resolved))
            }
        })
        .collect();

    let report = AliasReport {
        expected: aliases.len(),
        applied,
        unused: aliases
            .0
            .keys()
            .filter(|k| !hit.contains(k.as_str()))
            .cloned()
            .collect(),
    };
    if !report.is_consistent() {
        warn!(
            field = name_field,
            expected = report.expected,
            applied = report.applied,
            unused = ?report.unused,
            "alias overrides applied a different number of times than there are entries"
        );
    }

    Ok((table.with_column(key_field, keys)?, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_reduce_to_initial_and_surname() {
        assert_eq!(canonical_key("Guido Petti"), "g. petti");
        assert_eq!(canonical_key("J. Smith"), "j. smith");
        assert_eq!(canonical_key("Juan Manuel Rodríguez"), "j. manuel rodriguez");
        assert_eq!(canonical_key("  Siya   Kolisi "), "s. kolisi");
        assert_eq!(canonical_key("Pelé"), "p.");
        assert_eq!(canonical_key(""), "");
    }

    #[test]
    fn diacritics_and_special_letters() {
        assert_eq!(fold_diacritics("Ñández Øyvind"), "Nandez Oyvind");
        assert_eq!(canonical_key("Łukasz Groß"), "l. gross");
        assert_eq!(canonical_key("Alai D\u{2019}Angelo Leuila"), "a. d'angelo leuila");
    }

    #[test]
    fn aliases_rewrite_before_keying() {
        let aliases: AliasMap = [
            ("Guido Petti Pagadizabal", "G. Petti"),
            ("Nobody Here", "N. Here"),
        ]
        .into_iter()
        .collect();
        let table = Table::from_rows(
            ["name", "team"],
            vec![
                vec!["Guido Petti Pagadizabal".into(), "Argentina".into()],
                vec![Value::Null, "Argentina".into()],
                vec!["Pablo Matera".into(), "Argentina".into()],
            ],
        )
        .unwrap();

        let (out, report) = canonicalize(&table, "name", "name_link", &aliases).unwrap();
        assert_eq!(out.fields(), ["name", "team", "name_link"]);
        assert_eq!(out.value(0, "name_link"), Some(&Value::from("g. petti")));
        assert_eq!(out.value(1, "name_link"), Some(&Value::Null));
        assert_eq!(out.value(2, "name_link"), Some(&Value::from("p. matera")));
        // The original name column is untouched
        assert_eq!(out.value(0, "name"), Some(&Value::from("Guido Petti Pagadizabal")));

        assert_eq!(report.expected, 2);
        assert_eq!(report.applied, 1);
        assert_eq!(report.unused, vec!["Nobody Here".to_string()]);
        assert!(!report.is_consistent());
    }

    #[test]
    fn missing_name_field() {
        let table = Table::from_rows(["team"], vec![]).unwrap();
        let err = canonicalize(&table, "name", "name_link", &AliasMap::new()).unwrap_err();
        assert_eq!(err.fields(), vec!["name"]);
    }
}
