//! Embedded assets compiled into the binary.
//!
//! At compile time, `include_dir!` embeds everything under `cli/assets/`:
//!   - `git-ssh`: wrapper git invokes instead of `ssh`; `%{key}` is the
//!     private key path.

use anyhow::Result;
use include_dir::{Dir, include_dir};

static EMBEDDED_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Return the raw bytes of a single embedded asset.
///
/// # Errors
///
/// Returns an error if no asset with the given `name` exists.
pub fn get_asset(name: &str) -> Result<&'static [u8]> {
    EMBEDDED_ASSETS
        .get_file(name)
        .map(|f| f.contents())
        .ok_or_else(|| anyhow::anyhow!("embedded asset not found: {name}"))
}

/// Return an embedded asset as UTF-8 text.
///
/// # Errors
///
/// Returns an error if the asset is missing or not valid UTF-8.
pub fn get_text_asset(name: &str) -> Result<&'static str> {
    let bytes = get_asset(name)?;
    std::str::from_utf8(bytes).map_err(|e| anyhow::anyhow!("embedded asset {name} is not UTF-8: {e}"))
}
