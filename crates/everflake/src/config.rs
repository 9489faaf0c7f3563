use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_EPOCH_DATE;

/// The read-only configuration surface for a generator.
///
/// Loaded once at startup; everything here is frozen after construction.
/// The bit widths and epoch in particular must match across the whole
/// fleet and across every restart - see [`crate::BitLayout`].
///
/// The defaults reproduce the stock partition (28/9/13/13 bits, epoch
/// `2018-04-01`): roughly 8.7 years of fixed-width ids, 511 data centers,
/// 8191 workers each, 8192 ids per worker per second. Only the data-center
/// id has no default, because it is the one value every deployment must
/// consciously pick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidConfig {
    /// Width of the delta-seconds field in the fixed encoding. The
    /// timestamp keeps growing past this width; the encoding just switches
    /// to arbitrary precision.
    #[serde(default = "default_timestamp_bits")]
    pub timestamp_bits: u32,

    /// Width of the data-center id field.
    #[serde(default = "default_data_center_id_bits")]
    pub data_center_id_bits: u32,

    /// Width of the worker id field.
    #[serde(default = "default_worker_id_bits")]
    pub worker_id_bits: u32,

    /// Width of the per-second sequence field.
    #[serde(default = "default_sequence_bits")]
    pub sequence_bits: u32,

    /// The epoch as a `YYYY-MM-DD` date.
    #[serde(default = "default_epoch_date")]
    pub epoch_date: String,

    /// The data center this instance belongs to. Required.
    pub data_center_id: u64,

    /// How long an allocation may wait for the clock to advance before it
    /// fails with [`crate::Error::ClockStalled`].
    #[serde(default = "default_max_clock_stall")]
    pub max_clock_stall: Duration,
}

impl UidConfig {
    /// A configuration with stock defaults for the given data center.
    pub fn for_data_center(data_center_id: u64) -> Self {
        Self {
            timestamp_bits: default_timestamp_bits(),
            data_center_id_bits: default_data_center_id_bits(),
            worker_id_bits: default_worker_id_bits(),
            sequence_bits: default_sequence_bits(),
            epoch_date: default_epoch_date(),
            data_center_id,
            max_clock_stall: default_max_clock_stall(),
        }
    }

    /// Replaces the four field widths.
    pub fn with_bits(
        mut self,
        timestamp_bits: u32,
        data_center_id_bits: u32,
        worker_id_bits: u32,
        sequence_bits: u32,
    ) -> Self {
        self.timestamp_bits = timestamp_bits;
        self.data_center_id_bits = data_center_id_bits;
        self.worker_id_bits = worker_id_bits;
        self.sequence_bits = sequence_bits;
        self
    }

    /// Replaces the epoch date.
    pub fn with_epoch_date(mut self, epoch_date: impl Into<String>) -> Self {
        self.epoch_date = epoch_date.into();
        self
    }

    /// Replaces the clock stall budget.
    pub fn with_max_clock_stall(mut self, max_clock_stall: Duration) -> Self {
        self.max_clock_stall = max_clock_stall;
        self
    }
}

const fn default_timestamp_bits() -> u32 {
    28
}

const fn default_data_center_id_bits() -> u32 {
    9
}

const fn default_worker_id_bits() -> u32 {
    13
}

const fn default_sequence_bits() -> u32 {
    13
}

fn default_epoch_date() -> String {
    DEFAULT_EPOCH_DATE.to_owned()
}

const fn default_max_clock_stall() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_defaults() {
        let config = UidConfig::for_data_center(1);
        assert_eq!(config.timestamp_bits, 28);
        assert_eq!(config.data_center_id_bits, 9);
        assert_eq!(config.worker_id_bits, 13);
        assert_eq!(config.sequence_bits, 13);
        assert_eq!(config.epoch_date, "2018-04-01");
        assert_eq!(config.data_center_id, 1);
        assert_eq!(config.max_clock_stall, Duration::from_secs(5));
    }

    #[test]
    fn deserializes_with_defaults_for_everything_but_the_data_center() {
        let config: UidConfig = serde_json::from_str(r#"{"data_center_id": 3}"#).unwrap();
        assert_eq!(config, UidConfig::for_data_center(3));
    }

    #[test]
    fn missing_data_center_id_is_an_error() {
        assert!(serde_json::from_str::<UidConfig>("{}").is_err());
    }

    #[test]
    fn overrides_deserialize() {
        let config: UidConfig = serde_json::from_str(
            r#"{"data_center_id": 3, "timestamp_bits": 30, "epoch_date": "2020-01-01"}"#,
        )
        .unwrap();
        assert_eq!(config.timestamp_bits, 30);
        assert_eq!(config.epoch_date, "2020-01-01");
        assert_eq!(config.sequence_bits, 13);
    }
}
