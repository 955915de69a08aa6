use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::WalError;

const SECS_DIGITS: usize = 20;
const NANOS_DIGITS: usize = 9;
const FILE_PREFIX: &str = "wal-";
const FILE_SUFFIX: &str = ".log";

/// Last nanosecond timestamp handed out by [`Version::now`].
static LAST_ISSUED_NANOS: AtomicU64 = AtomicU64::new(0);

/// Identifies one WAL segment.
///
/// The token is `SSSSSSSSSSSSSSSSSSSS-NNNNNNNNN`: zero-padded Unix seconds and
/// zero-padded nanoseconds. Both fields are fixed width, so comparing tokens
/// as strings orders them by creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(String);

impl Version {
    /// A version for the current wall-clock time.
    ///
    /// Strictly greater than every version previously returned in this
    /// process, even if the clock stalls or two calls land on the same
    /// nanosecond.
    pub fn now() -> Self {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut last = LAST_ISSUED_NANOS.load(AtomicOrdering::Relaxed);
        let issued = loop {
            let candidate = wall.max(last + 1);
            match LAST_ISSUED_NANOS.compare_exchange_weak(
                last,
                candidate,
                AtomicOrdering::Relaxed,
                AtomicOrdering::Relaxed,
            ) {
                Ok(_) => break candidate,
                Err(actual) => last = actual,
            }
        };
        Self::from_nanos(issued)
    }

    /// Builds the version for an exact nanosecond timestamp.
    pub fn from_nanos(nanos: u64) -> Self {
        Version(format!(
            "{:0sw$}-{:0nw$}",
            nanos / 1_000_000_000,
            nanos % 1_000_000_000,
            sw = SECS_DIGITS,
            nw = NANOS_DIGITS
        ))
    }

    /// Validates a raw version token.
    pub fn parse(token: &str) -> Result<Self, WalError> {
        let invalid = || WalError::InvalidVersion(token.to_string());
        let (secs, nanos) = token.split_once('-').ok_or_else(invalid)?;
        let digits = |s: &str, width: usize| s.len() == width && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(secs, SECS_DIGITS) || !digits(nanos, NANOS_DIGITS) {
            return Err(invalid());
        }
        Ok(Version(token.to_string()))
    }

    /// Extracts the version from a `wal-<version>.log` file name.
    pub fn from_file_name(name: &str) -> Result<Self, WalError> {
        name.strip_prefix(FILE_PREFIX)
            .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            .ok_or_else(|| WalError::InvalidVersion(name.to_string()))
            .and_then(Self::parse)
    }

    /// The segment file name for this version: `wal-<version>.log`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}{}{}", FILE_PREFIX, self.0, FILE_SUFFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Orders two versions chronologically.
    #[must_use]
    pub fn compare(&self, other: &Version) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
