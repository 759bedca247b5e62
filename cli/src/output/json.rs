//! JSON output helpers.
//!
//! Provides the error-object formatter used by `--json` when a command fails.

use anyhow::{Context, Result};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format the stage list printed by `skiff stages --json`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_stages(stages: &[(&str, &str)]) -> Result<String> {
    let list: Vec<serde_json::Value> = stages
        .iter()
        .map(|(name, title)| serde_json::json!({ "name": name, "title": title }))
        .collect();
    serde_json::to_string_pretty(&serde_json::json!({ "stages": list }))
        .context("JSON serialization failed")
}
