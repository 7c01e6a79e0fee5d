//! Relational joins between two tables on positional key lists.
//!
//! Key equality is exact [`Value`] equality. A key containing `Null` never
//! matches anything, including another null key; such rows only surface in the
//! anti-join and outer residuals.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rosterlink_core::{Schema, SchemaError, Table, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;

/// Suffix applied to a left-table field whose name collides with a right-table field.
pub const LEFT_SUFFIX: &str = "_x";
/// Suffix applied to a right-table field whose name collides with a left-table field.
pub const RIGHT_SUFFIX: &str = "_y";

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    Inner,
    LeftOnly,
    RightOnly,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinMode {
    pub const ALL: [JoinMode; 6] = [
        JoinMode::Inner,
        JoinMode::LeftOnly,
        JoinMode::RightOnly,
        JoinMode::LeftOuter,
        JoinMode::RightOuter,
        JoinMode::FullOuter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::LeftOnly => "left_only",
            Self::RightOnly => "right_only",
            Self::LeftOuter => "left_outer",
            Self::RightOuter => "right_outer",
            Self::FullOuter => "full_outer",
        }
    }

    fn emits_matched(&self) -> bool {
        !matches!(self, Self::LeftOnly | Self::RightOnly)
    }

    fn emits_left_only(&self) -> bool {
        matches!(self, Self::LeftOnly | Self::LeftOuter | Self::FullOuter)
    }

    fn emits_right_only(&self) -> bool {
        matches!(self, Self::RightOnly | Self::RightOuter | Self::FullOuter)
    }
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinMode {
    type Err = ConfigurationError;

    /// Accepts snake_case or kebab-case names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownJoinMode(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Validated key positions plus the merged output schema for one join.
///
/// Output columns are the left table's fields followed by the right table's
/// non-key fields. Right key columns are folded into the left key columns.
#[derive(Debug, Clone)]
pub struct JoinLayout {
    left_key: Vec<usize>,
    right_key: Vec<usize>,
    right_payload: Vec<usize>,
    left_width: usize,
    schema: Schema,
}

impl JoinLayout {
    pub fn new<S: AsRef<str>>(
        left: &Table,
        left_key: &[S],
        right: &Table,
        right_key: &[S],
    ) -> Result<Self, SchemaError> {
        if left_key.is_empty() {
            return Err(SchemaError::EmptyKey { table: "left".into() });
        }
        if right_key.is_empty() {
            return Err(SchemaError::EmptyKey { table: "right".into() });
        }
        if left_key.len() != right_key.len() {
            return Err(SchemaError::KeyLengthMismatch {
                left: left_key.len(),
                right: right_key.len(),
            });
        }
        check_unique(left_key)?;
        check_unique(right_key)?;

        let left_idx = left.schema().resolve("left", left_key)?;
        let right_idx = right.schema().resolve("right", right_key)?;

        let right_payload: Vec<usize> = (0..right.schema().len())
            .filter(|i| !right_idx.contains(i))
            .collect();

        let left_names = left.fields();
        let right_names = right.fields();
        let payload_names: HashSet<&str> = right_payload
            .iter()
            .map(|&i| right_names[i].as_str())
            .collect();
        let left_set: HashSet<&str> = left_names.iter().map(String::as_str).collect();

        let mut fields: Vec<String> = left_names
            .iter()
            .map(|f| {
                if payload_names.contains(f.as_str()) {
                    format!("{f}{LEFT_SUFFIX}")
                } else {
                    f.clone()
                }
            })
            .collect();
        fields.extend(right_payload.iter().map(|&i| {
            let f = &right_names[i];
            if left_set.contains(f.as_str()) {
                format!("{f}{RIGHT_SUFFIX}")
            } else {
                f.clone()
            }
        }));

        Ok(Self {
            left_key: left_idx,
            right_key: right_idx,
            right_payload,
            left_width: left_names.len(),
            schema: Schema::new(fields)?,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Merge a left row and/or a right row into one output row.
    ///
    /// With no left row, the right key values populate the unified key
    /// columns and every other left column is `Null`.
    pub fn merge(&self, left: Option<&[Value]>, right: Option<&[Value]>) -> Vec<Value> {
        let mut row = Vec::with_capacity(self.schema.len());
        match left {
            Some(l) => row.extend_from_slice(l),
            None => {
                row.resize(self.left_width, Value::Null);
                if let Some(r) = right {
                    for (&li, &ri) in self.left_key.iter().zip(&self.right_key) {
                        row[li] = r[ri].clone();
                    }
                }
            }
        }
        match right {
            Some(r) => row.extend(self.right_payload.iter().map(|&i| r[i].clone())),
            None => row.resize(self.schema.len(), Value::Null),
        }
        row
    }

    /// Pair up rows by key, index-based.
    pub fn match_keys(&self, left: &Table, right: &Table) -> KeyMatchOutput {
        let mut index: HashMap<Vec<&Value>, Vec<usize>> = HashMap::new();
        for (ri, row) in right.rows().iter().enumerate() {
            if let Some(key) = key_of(row, &self.right_key) {
                index.entry(key).or_default().push(ri);
            }
        }

        let mut right_hit = vec![false; right.len()];
        let mut matched = Vec::new();
        let mut left_only = Vec::new();

        for (li, row) in left.rows().iter().enumerate() {
            let hits = key_of(row, &self.left_key).and_then(|k| index.get(&k));
            match hits {
                Some(rows) => {
                    for &ri in rows {
                        right_hit[ri] = true;
                        matched.push((li, ri));
                    }
                }
                None => left_only.push(li),
            }
        }

        let right_only = right_hit
            .iter()
            .enumerate()
            .filter(|(_, hit)| !**hit)
            .map(|(i, _)| i)
            .collect();

        KeyMatchOutput {
            matched,
            left_only,
            right_only,
        }
    }
}

/// Row indices produced by key matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMatchOutput {
    /// `(left_row, right_row)` in left order, then right order.
    pub matched: Vec<(usize, usize)>,
    pub left_only: Vec<usize>,
    pub right_only: Vec<usize>,
}

fn key_of<'a>(row: &'a [Value], cols: &[usize]) -> Option<Vec<&'a Value>> {
    cols.iter()
        .map(|&c| {
            let v = &row[c];
            (!v.is_null()).then_some(v)
        })
        .collect()
}

fn check_unique<S: AsRef<str>>(key: &[S]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for k in key {
        if !seen.insert(k.as_ref()) {
            return Err(SchemaError::DuplicateField(k.as_ref().to_string()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Join `left` and `right` on positional key lists.
///
/// `left_only` and `right_only` return rows in their own table's schema.
/// Every other mode returns the merged [`JoinLayout`] schema.
pub fn join<S: AsRef<str>>(
    left: &Table,
    left_key: &[S],
    right: &Table,
    right_key: &[S],
    mode: JoinMode,
) -> Result<Table, SchemaError> {
    let layout = JoinLayout::new(left, left_key, right, right_key)?;
    let keyed = layout.match_keys(left, right);

    debug!(
        %mode,
        matched = keyed.matched.len(),
        left_only = keyed.left_only.len(),
        right_only = keyed.right_only.len(),
        "join"
    );

    match mode {
        JoinMode::LeftOnly => return take_rows(left, &keyed.left_only),
        JoinMode::RightOnly => return take_rows(right, &keyed.right_only),
        _ => {}
    }

    let mut out = Table::new(layout.schema().clone());
    if mode.emits_matched() {
        for &(li, ri) in &keyed.matched {
            out.push_row(layout.merge(left.row(li), right.row(ri)))?;
        }
    }
    if mode.emits_left_only() {
        for &li in &keyed.left_only {
            out.push_row(layout.merge(left.row(li), None))?;
        }
    }
    if mode.emits_right_only() {
        for &ri in &keyed.right_only {
            out.push_row(layout.merge(None, right.row(ri)))?;
        }
    }
    Ok(out)
}

fn take_rows(table: &Table, indices: &[usize]) -> Result<Table, SchemaError> {
    let mut out = Table::new(table.schema().clone());
    for &i in indices {
        out.push_row(table.rows()[i].clone())?;
    }
    Ok(out)
}
