// File I/O operations

pub mod csv;
pub mod error;

pub use crate::csv::{read_table, read_table_from_str, write_table, write_table_to_string, CsvOptions};
pub use error::IoError;
