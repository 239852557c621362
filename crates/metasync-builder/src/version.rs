//! Version string helpers for mappings and loader listings.
//!
//! Current versions carry their build number as `<base>+build.<n>`. Older
//! mappings releases used `<game>.<n>` or `<game>-<n>` instead.

use crate::error::BuildError;

const BUILD_MARKER: &str = "+build.";

/// Separator between the base version and its build number.
pub fn separator(version: &str) -> &'static str {
    if version.contains(BUILD_MARKER) {
        BUILD_MARKER
    } else {
        "."
    }
}

/// The build number: the integer after the last `.`.
pub fn build_number(version: &str) -> Result<u32, BuildError> {
    let (_, tail) = version
        .rsplit_once('.')
        .ok_or_else(|| invalid(version, "no build number"))?;
    tail.parse()
        .map_err(|_| invalid(version, "build number is not an integer"))
}

/// `version` without a trailing `+build.<n>`.
pub fn without_build(version: &str) -> &str {
    if version.contains(BUILD_MARKER)
        && let Some((base, _)) = version.rsplit_once('+')
    {
        return base;
    }
    version
}

/// The game version a mappings version targets.
///
/// `1.19+build.3` → `1.19`. Legacy versions drop everything after the last
/// `-` if there is one, else after the last `.`.
pub fn game_version(version: &str) -> Result<&str, BuildError> {
    if version.contains(BUILD_MARKER) {
        return Ok(without_build(version));
    }
    let sep = if version.contains('-') { '-' } else { '.' };
    version
        .rsplit_once(sep)
        .map(|(base, _)| base)
        .ok_or_else(|| invalid(version, "no game version component"))
}

fn invalid(version: &str, reason: &'static str) -> BuildError {
    BuildError::InvalidVersion {
        version: version.to_string(),
        reason,
    }
}
