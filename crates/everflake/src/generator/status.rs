use crate::Uid;

/// The outcome of a single, non-blocking allocation attempt.
///
/// `Pending` makes no state change, so callers are free to poll again, back
/// off, or give up. [`crate::UidGenerator::next_uid`] is the blocking loop
/// most callers want; `Pending` is what lets tests drive the state machine
/// deterministically and lets embedders supply their own wait strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenStatus {
    /// A unique identifier was produced.
    Ready {
        /// The newly allocated identifier.
        uid: Uid,
    },
    /// Nothing can be produced until the clock advances.
    ///
    /// Either the local clock moved backward behind the last allocation, or
    /// the sequence space for the current second is exhausted. Poll again
    /// once the clock reads a second strictly greater than `until`.
    Pending {
        /// The last committed second; allocation resumes past it.
        until: i64,
    },
}

impl GenStatus {
    /// Unwraps `Ready`, panicking on `Pending`. Test helper semantics.
    pub fn unwrap_ready(self) -> Uid {
        match self {
            Self::Ready { uid } => uid,
            Self::Pending { until } => {
                panic!("expected a ready uid, but the generator is pending until {until}")
            }
        }
    }

    /// Unwraps `Pending`, panicking on `Ready`. Test helper semantics.
    pub fn unwrap_pending(self) -> i64 {
        match self {
            Self::Ready { uid } => panic!("expected pending, but got uid {uid}"),
            Self::Pending { until } => until,
        }
    }
}
