use std::collections::HashMap;

use rosterlink_core::{Table, Value};
use tracing::{debug, info};

use crate::error::ReconError;
use crate::join::JoinLayout;
use crate::model::{FuzzyMatch, LinkOutcome, LinkSummary};
use crate::similarity::{ratio, MatchThreshold};

/// Link `left` and `right` by exact `(group_key, name)` keys, then by fuzzy
/// name similarity within each group. See [`link_with_report`].
pub fn link(
    left: &Table,
    right: &Table,
    group_key: &str,
    name_left: &str,
    name_right: &str,
    threshold: MatchThreshold,
) -> Result<Table, ReconError> {
    link_with_report(left, right, group_key, name_left, name_right, threshold).map(|o| o.table)
}

/// Link two entity tables and report how each output row came about.
///
/// 1. Rows whose `(group_key, name)` keys are equal are joined outright.
/// 2. Of the remaining rows, each left row (table order) is scored against
///    every unconsumed right row in the same group (table order). The first
///    pair scoring strictly above `threshold` is merged and both rows are
///    consumed.
/// 3. Anything still unmatched is emitted with the other side null-filled.
///
/// Name fields must already hold canonical keys. The output schema is the
/// full outer join schema of the two tables; fuzzy matches keep the left
/// table's key values.
pub fn link_with_report(
    left: &Table,
    right: &Table,
    group_key: &str,
    name_left: &str,
    name_right: &str,
    threshold: MatchThreshold,
) -> Result<LinkOutcome, ReconError> {
    let layout = JoinLayout::new(left, &[group_key, name_left], right, &[group_key, name_right])?;
    let keyed = layout.match_keys(left, right);

    let group_l = left.schema().resolve("left", &[group_key])?[0];
    let group_r = right.schema().resolve("right", &[group_key])?[0];
    let name_l = left.schema().resolve("left", &[name_left])?[0];
    let name_r = right.schema().resolve("right", &[name_right])?[0];

    let mut out = Table::new(layout.schema().clone());
    for &(li, ri) in &keyed.matched {
        out.push_row(layout.merge(left.row(li), right.row(ri)))?;
    }

    // Blocking: unmatched right rows bucketed by group, table order kept.
    let mut pools: HashMap<&Value, Vec<usize>> = HashMap::new();
    for &ri in &keyed.right_only {
        let row = &right.rows()[ri];
        if row[group_r].is_null() || row[name_r].is_null() {
            continue;
        }
        pools.entry(&row[group_r]).or_default().push(ri);
    }

    let mut left_used = vec![false; left.len()];
    let mut right_used = vec![false; right.len()];
    let mut fuzzy_matches = Vec::new();

    for &li in &keyed.left_only {
        let row = &left.rows()[li];
        let (Some(pool), Some(left_name)) = (pools.get(&row[group_l]), row[name_l].to_text()) else {
            continue;
        };

        for &ri in pool {
            if right_used[ri] {
                continue;
            }
            let Some(right_name) = right.rows()[ri][name_r].to_text() else {
                continue;
            };
            let score = ratio(&left_name, &right_name);
            if threshold.accepts(score) {
                debug!(left = %left_name, right = %right_name, score, group = %row[group_l], "fuzzy match");
                left_used[li] = true;
                right_used[ri] = true;
                fuzzy_matches.push(FuzzyMatch {
                    left_row: li,
                    right_row: ri,
                    left_name,
                    right_name,
                    score,
                });
                break;
            }
        }
    }

    for m in &fuzzy_matches {
        out.push_row(layout.merge(left.row(m.left_row), right.row(m.right_row)))?;
    }

    let mut summary = LinkSummary {
        exact: keyed.matched.len(),
        fuzzy: fuzzy_matches.len(),
        ..Default::default()
    };
    for &li in keyed.left_only.iter().filter(|&&i| !left_used[i]) {
        out.push_row(layout.merge(left.row(li), None))?;
        summary.left_only += 1;
    }
    for &ri in keyed.right_only.iter().filter(|&&i| !right_used[i]) {
        out.push_row(layout.merge(None, right.row(ri)))?;
        summary.right_only += 1;
    }

    info!(
        exact = summary.exact,
        fuzzy = summary.fuzzy,
        left_only = summary.left_only,
        right_only = summary.right_only,
        threshold = threshold.value(),
        "link complete"
    );

    Ok(LinkOutcome {
        table: out,
        summary,
        fuzzy_matches,
    })
}
