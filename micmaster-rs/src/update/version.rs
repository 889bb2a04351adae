//! Dotted version comparison.

use super::UpdateError;
use std::cmp::Ordering;

/// Parse `1.2.10` into `[1, 2, 10]`.
pub fn parse_version(version: &str) -> Result<Vec<u64>, UpdateError> {
    version
        .trim()
        .split('.')
        .map(|segment| {
            segment
                .parse::<u64>()
                .map_err(|_| UpdateError::Parse(version.to_string()))
        })
        .collect()
}

/// True if `latest` is strictly newer than `current`.
///
/// Segments compare numerically and left to right, so `1.10` is newer than
/// `1.9` and `1.0.0` is newer than `1.0`.
pub fn is_newer(latest: &str, current: &str) -> Result<bool, UpdateError> {
    let latest = parse_version(latest)?;
    let current = parse_version(current)?;
    Ok(latest.cmp(&current) == Ordering::Greater)
}
