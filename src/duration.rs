//! Short human duration strings.
//!
//! Parses the `<integer><unit>` shape used by giveaway commands:
//! `"30s"`, `"5m"`, `"1h"`, `"2d"`. Nothing else — no decimals, no
//! whitespace inside, no combined units like `"1h30m"`.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([smhd])$").expect("duration pattern is valid"));

/// Rejection for any input not matching `<integer><unit>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed duration {input:?} (expected forms like 30s, 5m, 1h, 2d)")]
pub struct DurationError {
    /// The offending input, trimmed.
    pub input: String,
}

/// Converts a short human duration string to seconds.
///
/// Input is trimmed and matched case-insensitively. Unit multipliers:
/// s=1, m=60, h=3600, d=86400.
///
/// # Errors
///
/// Returns [`DurationError`] for any input not matching the exact
/// `<integer><unit>` shape, including values that overflow `u64`.
pub fn parse_duration(input: &str) -> Result<u64, DurationError> {
    let trimmed = input.trim().to_ascii_lowercase();
    let malformed = || DurationError {
        input: input.trim().to_string(),
    };

    let caps = DURATION_RE.captures(&trimmed).ok_or_else(malformed)?;

    let value: u64 = caps[1].parse().map_err(|_| malformed())?;
    let multiplier = match &caps[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => unreachable!("pattern only admits smhd"),
    };

    value.checked_mul(multiplier).ok_or_else(malformed)
}
