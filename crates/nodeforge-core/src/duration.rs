//! Human-readable duration strings used in `nodeforge.toml`.
//!
//! Accepts `"500ms"`, `"30s"`, `"5m"`, `"1h"`, or a bare number of seconds.

use std::time::Duration;

use crate::config::ConfigError;

/// Parse a duration string like "30s" or "5m".
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    if let Some(ms) = s.strip_suffix("ms") {
        return ms.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| invalid());
    }

    let (digits, unit) = match s.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&s[..idx], c),
        Some(_) => (s, 's'),
        None => return Err(invalid()),
    };

    let value = digits.trim().parse::<u64>().map_err(|_| invalid())?;
    let scale: u64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        _ => return Err(invalid()),
    };
    let secs = value.checked_mul(scale).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}
