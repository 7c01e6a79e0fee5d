//! `rosterlink-recon`: Join and record linkage engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns joined or linked
//! tables plus reports. No CLI or IO dependencies.

pub mod canonical;
pub mod config;
pub mod engine;
pub mod error;
pub mod join;
pub mod matcher;
pub mod model;
pub mod similarity;

pub use canonical::{canonical_key, canonicalize, AliasMap, AliasReport};
pub use config::{LinkConfig, SourceConfig};
pub use engine::{run, ChainInput};
pub use error::{ConfigurationError, ReconError};
pub use join::{join, JoinMode};
pub use matcher::{link, link_with_report};
pub use model::{ChainReport, ChainResult, FuzzyMatch, LinkOutcome, LinkSummary};
pub use similarity::{ratio, MatchThreshold};
