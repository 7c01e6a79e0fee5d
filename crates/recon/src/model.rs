use rosterlink_core::Table;
use serde::Serialize;

use crate::canonical::AliasReport;

// ---------------------------------------------------------------------------
// Pairwise linkage
// ---------------------------------------------------------------------------

/// Row counts from one `link` call. Each output row lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub exact: usize,
    pub fuzzy: usize,
    pub left_only: usize,
    pub right_only: usize,
}

impl LinkSummary {
    pub fn matched(&self) -> usize {
        self.exact + self.fuzzy
    }

    pub fn total_rows(&self) -> usize {
        self.exact + self.fuzzy + self.left_only + self.right_only
    }
}

/// An accepted fuzzy pair, by input row index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyMatch {
    pub left_row: usize,
    pub right_row: usize,
    pub left_name: String,
    pub right_name: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub table: Table,
    pub summary: LinkSummary,
    pub fuzzy_matches: Vec<FuzzyMatch>,
}

// ---------------------------------------------------------------------------
// Multi-source chain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Sources already folded into the left table, in chain order.
    pub left: Vec<String>,
    pub right: String,
    pub summary: LinkSummary,
    pub fuzzy_matches: Vec<FuzzyMatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub rows_in: usize,
    /// Rows after projection, stacking and de-duplication.
    pub rows_prepared: usize,
    pub aliases: AliasReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainMeta {
    pub config_name: String,
    pub threshold: f64,
    pub engine_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub meta: ChainMeta,
    pub sources: Vec<SourceReport>,
    pub steps: Vec<StepReport>,
    /// Rows left after the required-source filter.
    pub rows_out: usize,
    /// Rows removed by the required-source filter.
    pub rows_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct ChainResult {
    pub table: Table,
    pub report: ChainReport,
}
