//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials and input are available before starting a run
//! that would otherwise fail midway, after paid calls were already made.

use crate::config::Provider;
use crate::error::{AnnoError, Result};
use std::path::Path;

/// Run pre-flight checks for an annotation run.
pub fn check_annotate(provider: Provider, input: &Path) -> Result<()> {
    check_api_key(provider)?;
    check_input(input)
}

/// Check that the provider's API key is configured.
fn check_api_key(provider: Provider) -> Result<()> {
    let var = provider.api_key_var();
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(AnnoError::Config(format!(
            "{} is empty. Set it in .env or export it in your shell.",
            var
        ))),
        Err(_) => Err(AnnoError::Config(format!(
            "{} not set. Set it in .env or export it in your shell.",
            var
        ))),
    }
}

/// Check that the input table exists and is a file.
fn check_input(input: &Path) -> Result<()> {
    if input.is_file() {
        Ok(())
    } else {
        Err(AnnoError::Config(format!(
            "Input file not found: {}",
            input.display()
        )))
    }
}
