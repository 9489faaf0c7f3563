use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, NaiveTime};

use crate::{Error, Result};

/// Default epoch date: Sunday, April 1, 2018 00:00:00 UTC.
pub const DEFAULT_EPOCH_DATE: &str = "2018-04-01";

/// A trait for clock sources that report whole seconds since the Unix
/// epoch.
///
/// This abstraction exists so tests can drive the allocation state machine
/// with a deterministic clock. Production code uses [`WallClock`], which is
/// deliberately a wall clock: the allocator's clock-regression handling is
/// what makes NTP steps survivable.
///
/// # Example
///
/// ```
/// use everflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn unix_seconds(&self) -> i64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.unix_seconds(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in whole seconds since the Unix epoch.
    fn unix_seconds(&self) -> i64;
}

/// The system wall clock, read on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn unix_seconds(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX_EPOCH")
            .as_secs() as i64
    }
}

/// The fixed calendar instant identifiers count seconds from.
///
/// Configured once as a plain `YYYY-MM-DD` date (no time-of-day) and frozen
/// for the lifetime of the deployment: every encoded timestamp is relative
/// to it, so moving the epoch re-maps every ID ever issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Epoch {
    seconds: i64,
}

impl Epoch {
    /// Render format for decoded timestamps.
    pub const DATETIME_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    const DATE_FORMAT: &'static str = "%Y-%m-%d";

    /// Parses a `YYYY-MM-DD` date into the epoch at UTC midnight of that
    /// day.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidEpoch`] if the input is not a valid calendar date.
    pub fn from_date(input: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(input, Self::DATE_FORMAT)
            .map_err(|_| Error::InvalidEpoch {
                input: input.into(),
            })?;
        Ok(Self {
            seconds: date.and_time(NaiveTime::MIN).and_utc().timestamp(),
        })
    }

    /// The epoch as seconds since the Unix epoch.
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Formats the instant `delta_seconds` after the epoch as
    /// `YYYY-MM-DD HH:MM:SS` (UTC).
    ///
    /// Returns `None` when the instant falls outside the representable
    /// calendar range, which no identifier produced by this crate does.
    pub fn format_instant(&self, delta_seconds: u64) -> Option<String> {
        let seconds = i64::try_from(delta_seconds)
            .ok()
            .and_then(|delta| self.seconds.checked_add(delta))?;
        let instant = DateTime::from_timestamp(seconds, 0)?;
        Some(instant.format(Self::DATETIME_FORMAT).to_string())
    }
}

impl Default for Epoch {
    /// The [`DEFAULT_EPOCH_DATE`] epoch.
    fn default() -> Self {
        Self {
            seconds: 1_522_540_800,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_default_date_to_the_default_epoch() {
        let epoch = Epoch::from_date(DEFAULT_EPOCH_DATE).unwrap();
        assert_eq!(epoch, Epoch::default());
        assert_eq!(epoch.seconds(), 1_522_540_800);
    }

    #[test]
    fn rejects_malformed_dates() {
        for input in ["", "2018", "2018-13-01", "2018-02-30", "01-04-2018", "2018-04-01T00:00"] {
            let err = Epoch::from_date(input).unwrap_err();
            assert!(matches!(err, Error::InvalidEpoch { .. }), "input: {input:?}");
        }
    }

    #[test]
    fn formats_instants_relative_to_the_epoch() {
        let epoch = Epoch::default();
        assert_eq!(epoch.format_instant(0).unwrap(), "2018-04-01 00:00:00");
        assert_eq!(epoch.format_instant(100).unwrap(), "2018-04-01 00:01:40");
        assert_eq!(epoch.format_instant(86_400).unwrap(), "2018-04-02 00:00:00");
    }

    #[test]
    fn format_instant_rejects_out_of_range_deltas() {
        assert!(Epoch::default().format_instant(u64::MAX).is_none());
    }

    #[test]
    fn wall_clock_reads_a_plausible_present() {
        // 2020-01-01 as a lower bound; the test machine's clock is past it.
        assert!(WallClock.unix_seconds() > 1_577_836_800);
    }
}
