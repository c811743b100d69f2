//! CLI command implementations.

mod annotate;
mod config;
mod validate;

pub use annotate::run_annotate;
pub use config::run_config;
pub use validate::{run_validate, validate_csv, RowReport};
