use std::sync::{MutexGuard, PoisonError};

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `everflake` can emit.
///
/// Construction-time variants (`LayoutOverflow`, `ZeroWidthField`,
/// `InvalidEpoch`, `WorkerIdAssignment`, `WorkerIdOutOfRange`,
/// `DataCenterIdOutOfRange`) are fatal: a process that hits one must not
/// start handing out IDs. The remaining variants surface per call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The sub-second fields plus the sign bit no longer fit in 64 bits.
    ///
    /// Only the timestamp field may grow without bound; data-center, worker
    /// and sequence widths must leave the sign bit free.
    #[error(
        "bit layout overflows: {data_center_id_bits} + {worker_id_bits} + {sequence_bits} field bits plus the sign bit must stay below 64"
    )]
    LayoutOverflow {
        data_center_id_bits: u32,
        worker_id_bits: u32,
        sequence_bits: u32,
    },

    /// A field was configured with a width of zero bits.
    #[error("{field} must be at least one bit wide")]
    ZeroWidthField { field: &'static str },

    /// A value was too large for its configured field width.
    ///
    /// Packing an oversized value would silently corrupt the neighboring
    /// fields, so this is checked before any shifting happens.
    #[error("{field} {value} exceeds the maximum {max} allowed by the configured bit layout")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// The input could not be decoded as an identifier.
    #[error("`{input}` is not a valid uid")]
    InvalidUid { input: String },

    /// The configured epoch is not a `YYYY-MM-DD` calendar date.
    #[error("epoch `{input}` is not a valid YYYY-MM-DD date")]
    InvalidEpoch { input: String },

    /// The wall clock reads earlier than the configured epoch.
    #[error("current time {now}s predates the configured epoch {epoch}s")]
    ClockBeforeEpoch { now: i64, epoch: i64 },

    /// The clock failed to advance within the configured stall budget.
    ///
    /// Allocation waits for the clock when the local clock moved backward or
    /// when the per-second sequence space is exhausted. A clock that never
    /// advances would otherwise hang the caller forever.
    #[error("clock failed to advance past second {stalled_at} after {waited_ms}ms")]
    ClockStalled { stalled_at: i64, waited_ms: u64 },

    /// The external worker-id backend could not produce an id.
    #[error("worker id assignment failed: {reason}")]
    WorkerIdAssignment { reason: String },

    /// The assigned worker id does not fit the configured bit layout.
    #[error("worker id {worker_id} must be less than {max}")]
    WorkerIdOutOfRange { worker_id: u64, max: u64 },

    /// The configured data-center id does not fit the configured bit layout.
    #[error("data center id {data_center_id} must be less than {max}")]
    DataCenterIdOutOfRange { data_center_id: u64, max: u64 },

    /// The operation failed because the generator lock was poisoned.
    ///
    /// This occurs when another thread panicked while holding the lock.
    #[error("generator lock poisoned by a panicked thread")]
    LockPoisoned,
}

// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
