//! `rosterlink-core`: values, records and schema-checked tables.
//!
//! Every other crate in the workspace exchanges data through [`Table`].
//! A table owns its [`Schema`] and a list of rows; each row carries exactly
//! one [`Value`] per field, with missing data held as [`Value::Null`].

pub mod error;
pub mod table;
pub mod value;

pub use error::SchemaError;
pub use table::{Record, Schema, Table};
pub use value::Value;
