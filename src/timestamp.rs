//! Entry modification times.
//!
//! Containers record each entry's modification time as a FILETIME tick
//! count: 100-nanosecond intervals since January 1, 1601 (UTC). This keeps
//! the on-disk value independent of the host clock representation and lets
//! a restored document carry the mtime it had when it was sealed.
//!
//! # Example
//!
//! ```rust
//! use docseal::Timestamp;
//! use std::time::{Duration, UNIX_EPOCH};
//!
//! let when = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
//! let ts = Timestamp::from_system_time(when).unwrap();
//! assert_eq!(ts.as_unix_secs(), 1_700_000_000);
//! assert_eq!(ts.as_system_time(), when);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Ticks between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_DIFF: u64 = 116_444_736_000_000_000;

/// Number of 100-nanosecond ticks per second.
const TICKS_PER_SECOND: u64 = 10_000_000;

/// An entry modification time with 100 ns precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    ticks: u64,
}

impl Timestamp {
    /// The Unix epoch.
    pub const UNIX_EPOCH: Timestamp = Timestamp::from_filetime(FILETIME_UNIX_DIFF);

    /// Creates a timestamp from raw FILETIME ticks.
    #[inline]
    pub const fn from_filetime(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Returns the current time.
    ///
    /// Falls back to the Unix epoch if the system clock is outside the
    /// representable range.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now()).unwrap_or(Self::UNIX_EPOCH)
    }

    /// Converts a `SystemTime`, truncating to 100 ns.
    ///
    /// Returns `None` for times before 1601 or past the end of the range.
    pub fn from_system_time(time: SystemTime) -> Option<Self> {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => FILETIME_UNIX_DIFF
                .checked_add(duration_to_ticks(after)?)
                .map(Self::from_filetime),
            Err(e) => FILETIME_UNIX_DIFF
                .checked_sub(duration_to_ticks(e.duration())?)
                .map(Self::from_filetime),
        }
    }

    /// Returns the raw FILETIME ticks.
    #[inline]
    pub const fn as_filetime(&self) -> u64 {
        self.ticks
    }

    /// Returns whole seconds relative to the Unix epoch.
    ///
    /// Pre-epoch values round towards negative infinity.
    pub fn as_unix_secs(&self) -> i64 {
        let rel = self.ticks as i128 - FILETIME_UNIX_DIFF as i128;
        rel.div_euclid(TICKS_PER_SECOND as i128) as i64
    }

    /// Converts to a `SystemTime` without losing precision.
    pub fn as_system_time(&self) -> SystemTime {
        if self.ticks >= FILETIME_UNIX_DIFF {
            UNIX_EPOCH + ticks_to_duration(self.ticks - FILETIME_UNIX_DIFF)
        } else {
            UNIX_EPOCH - ticks_to_duration(FILETIME_UNIX_DIFF - self.ticks)
        }
    }
}

fn duration_to_ticks(d: Duration) -> Option<u64> {
    d.as_secs()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(u64::from(d.subsec_nanos() / 100))
}

fn ticks_to_duration(ticks: u64) -> Duration {
    let nanos = (ticks % TICKS_PER_SECOND) * 100;
    Duration::new(ticks / TICKS_PER_SECOND, nanos as u32)
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::UNIX_EPOCH
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> SystemTime {
        ts.as_system_time()
    }
}
