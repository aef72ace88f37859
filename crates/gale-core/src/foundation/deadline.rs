//! Deadline resolution for inbound calls.
//!
//! A caller may pin the absolute deadline of a call through the
//! [`DEADLINE_HEADER`]. When present, it wins over the server's default
//! timeout; when absent (or zero, or unparsable), the deadline becomes
//! `now + default`.
//!
//! The header value is the deadline in nanoseconds since the Unix epoch,
//! written as a decimal integer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::headers::{DEADLINE_HEADER, Headers};

/// Default timeout applied to calls without a deadline header.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads the deadline header, if any.
///
/// Returns `None` when the header is missing, is not an integer, or is zero.
pub fn parse_deadline(headers: &Headers) -> Option<SystemTime> {
    let nanos = headers.get(DEADLINE_HEADER)?.trim().parse::<u64>().ok()?;
    if nanos == 0 {
        return None;
    }
    UNIX_EPOCH.checked_add(Duration::from_nanos(nanos))
}

/// Encodes `at` in the deadline header format.
///
/// Times before the epoch encode as `0`, which reads back as "no deadline".
pub fn encode_deadline(at: SystemTime) -> String {
    let nanos = at
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0);
    nanos.to_string()
}

/// Writes `at` into the deadline header of `headers`.
pub fn set_deadline(headers: &mut Headers, at: SystemTime) {
    headers.insert(DEADLINE_HEADER, encode_deadline(at));
}

/// Resolves the effective deadline of a call.
pub fn resolve(headers: &Headers, default_timeout: Duration) -> SystemTime {
    parse_deadline(headers).unwrap_or_else(|| SystemTime::now() + default_timeout)
}
