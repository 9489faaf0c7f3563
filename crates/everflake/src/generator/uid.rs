use core::cmp::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::{
    BitLayout, DecodedUid, Epoch, Error, GenStatus, Result, TimeSource, Uid, UidConfig, WallClock,
    WorkerIdAssigner,
};

/// Allocation state: the last committed second and the position within it.
#[derive(Debug)]
struct AllocState {
    /// Unix second of the most recent allocation, -1 before first use.
    last_second: i64,
    sequence: u64,
}

/// A thread-safe unique-id generator.
///
/// One instance owns one allocation stream: a `(data center, worker)`
/// identity plus the `(second, sequence)` counter state, guarded by a
/// [`Mutex`] so concurrent callers never commit overlapping state. IDs from
/// a single instance are strictly increasing; uniqueness across instances
/// holds as long as every live instance of a data center wears a distinct
/// worker id, which is the [`WorkerIdAssigner`]'s job.
///
/// Nothing is persisted. A restarted process re-assigns its worker id and
/// starts from a clean `(second, sequence)`, which is safe precisely
/// because the assigner hands the replacement a different id (or the clock
/// has moved on).
///
/// # Example
///
/// ```
/// use everflake::{StaticWorkerIdAssigner, UidConfig, UidGenerator};
///
/// let config = UidConfig::for_data_center(1);
/// let generator = UidGenerator::new(&config, &StaticWorkerIdAssigner::new(42)).unwrap();
///
/// let uid = generator.next_uid().unwrap();
/// let decoded = generator.parse(&uid.to_string()).unwrap();
/// assert_eq!(decoded.data_center_id, 1);
/// assert_eq!(decoded.worker_id, 42);
/// ```
#[derive(Debug)]
pub struct UidGenerator<T = WallClock>
where
    T: TimeSource,
{
    layout: BitLayout,
    epoch: Epoch,
    data_center_id: u64,
    worker_id: u64,
    max_clock_stall: Duration,
    state: Arc<Mutex<AllocState>>,
    time: T,
}

impl UidGenerator<WallClock> {
    /// Creates a generator on the system wall clock.
    ///
    /// Validates the configured bit widths and epoch, obtains a worker id
    /// from `assigner`, and bounds-checks the resulting identity. Every
    /// failure here is fatal by design: a process that cannot establish a
    /// valid `(data center, worker)` identity must not hand out IDs.
    ///
    /// # Errors
    ///
    /// - [`Error::LayoutOverflow`] / [`Error::ZeroWidthField`] for invalid
    ///   bit widths
    /// - [`Error::InvalidEpoch`] for an unparseable epoch date
    /// - [`Error::WorkerIdAssignment`] when the assigner backend fails
    /// - [`Error::WorkerIdOutOfRange`] / [`Error::DataCenterIdOutOfRange`]
    ///   when the identity does not fit the layout
    pub fn new(config: &UidConfig, assigner: &dyn WorkerIdAssigner) -> Result<Self> {
        Self::with_time_source(config, assigner, WallClock)
    }
}

impl<T> UidGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator on a caller-supplied clock.
    ///
    /// Same contract as [`UidGenerator::new`]; the clock is what tests and
    /// embedders with their own time infrastructure swap out.
    pub fn with_time_source(
        config: &UidConfig,
        assigner: &dyn WorkerIdAssigner,
        time: T,
    ) -> Result<Self> {
        let layout = BitLayout::new(
            config.timestamp_bits,
            config.data_center_id_bits,
            config.worker_id_bits,
            config.sequence_bits,
        )?;
        let epoch = Epoch::from_date(&config.epoch_date)?;

        if config.data_center_id >= layout.max_data_center_id() {
            return Err(Error::DataCenterIdOutOfRange {
                data_center_id: config.data_center_id,
                max: layout.max_data_center_id(),
            });
        }
        let worker_id = assigner.assign_worker_id(config.data_center_id, &layout)?;
        if worker_id >= layout.max_worker_id() {
            return Err(Error::WorkerIdOutOfRange {
                worker_id,
                max: layout.max_worker_id(),
            });
        }

        info!(
            timestamp_bits = layout.timestamp_bits(),
            data_center_id_bits = layout.data_center_id_bits(),
            worker_id_bits = layout.worker_id_bits(),
            sequence_bits = layout.sequence_bits(),
            epoch = %config.epoch_date,
            "initialized bit layout"
        );
        info!(
            data_center_id = config.data_center_id,
            worker_id, "initialized node identity"
        );

        Ok(Self {
            layout,
            epoch,
            data_center_id: config.data_center_id,
            worker_id,
            max_clock_stall: config.max_clock_stall,
            state: Arc::new(Mutex::new(AllocState {
                last_second: -1,
                sequence: 0,
            })),
            time,
        })
    }

    /// Attempts one allocation without blocking.
    ///
    /// The whole read-modify-write of `(last_second, sequence)` happens
    /// under the state lock, so two concurrent calls can never observe or
    /// commit the same pair. A [`GenStatus::Pending`] result leaves the
    /// state untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockBeforeEpoch`] when the clock reads earlier than the
    ///   configured epoch
    /// - [`Error::LockPoisoned`] if another thread panicked mid-allocation
    pub fn try_poll_uid(&self) -> Result<GenStatus> {
        let now = self.time.unix_seconds();
        let mut state = self.state.lock()?;

        let status = match now.cmp(&state.last_second) {
            // The clock moved backward (NTP step). Emitting would reuse or
            // precede committed timestamps, so wait it out.
            Ordering::Less => GenStatus::Pending {
                until: state.last_second,
            },
            Ordering::Greater => {
                let uid = self.pack_at(now, 0)?;
                state.last_second = now;
                state.sequence = 0;
                GenStatus::Ready { uid }
            }
            Ordering::Equal => {
                let sequence = (state.sequence + 1) & self.layout.max_sequence();
                if sequence == 0 {
                    // Sequence space for this second is exhausted.
                    GenStatus::Pending {
                        until: state.last_second,
                    }
                } else {
                    let uid = self.pack_at(now, sequence)?;
                    state.sequence = sequence;
                    GenStatus::Ready { uid }
                }
            }
        };

        Ok(status)
    }

    /// Allocates the next identifier, waiting for the clock when it must.
    ///
    /// Blocks while the generator is throttled - clock regression, or more
    /// than `max_sequence + 1` requests inside one second - by polling the
    /// clock and yielding the thread. Sustained overload therefore degrades
    /// into backpressure at the configured rate instead of silent overflow.
    /// The wait is bounded by the configured stall budget.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockStalled`] when the clock fails to advance within the
    ///   stall budget
    /// - Everything [`Self::try_poll_uid`] can return
    #[instrument(level = "trace", skip(self))]
    pub fn next_uid(&self) -> Result<Uid> {
        let mut stall_started: Option<Instant> = None;

        loop {
            match self.try_poll_uid()? {
                GenStatus::Ready { uid } => return Ok(uid),
                GenStatus::Pending { until } => {
                    let started = *stall_started.get_or_insert_with(Instant::now);
                    let waited = started.elapsed();
                    if waited > self.max_clock_stall {
                        warn!(
                            stalled_at = until,
                            waited_ms = waited.as_millis() as u64,
                            "clock failed to advance, giving up"
                        );
                        return Err(Error::ClockStalled {
                            stalled_at: until,
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    thread::yield_now();
                }
            }
        }
    }

    /// Allocates the next identifier and renders it as `prefix` + decimal.
    ///
    /// The prefix is plain string concatenation with no semantic weight; it
    /// is not consulted when parsing.
    pub fn next_string(&self, prefix: &str) -> Result<String> {
        Ok(format!("{prefix}{}", self.next_uid()?))
    }

    /// Parses the decimal form of an identifier back into its fields.
    ///
    /// Stateless and lock-free: safe to call from any thread at any rate,
    /// including for IDs another instance produced - the result is only
    /// meaningful under the same layout and epoch.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUid`] for input that is not a plain decimal or whose
    /// timestamp lies outside the representable range.
    pub fn parse(&self, input: &str) -> Result<DecodedUid> {
        let uid: Uid = input.parse()?;
        self.decode(&uid)
    }

    /// [`Self::parse`] for an already-materialized [`Uid`].
    pub fn decode(&self, uid: &Uid) -> Result<DecodedUid> {
        let fields = self.layout.unpack(uid)?;
        let timestamp =
            self.epoch
                .format_instant(fields.delta_seconds)
                .ok_or_else(|| Error::InvalidUid {
                    input: uid.to_string(),
                })?;

        Ok(DecodedUid {
            uid: uid.to_string(),
            timestamp,
            data_center_id: fields.data_center_id,
            worker_id: fields.worker_id,
            sequence: fields.sequence,
        })
    }

    /// The layout this generator encodes with.
    pub const fn layout(&self) -> &BitLayout {
        &self.layout
    }

    /// The epoch this generator counts seconds from.
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// The data center configured for this instance.
    pub const fn data_center_id(&self) -> u64 {
        self.data_center_id
    }

    /// The worker id assigned to this instance at startup.
    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    fn pack_at(&self, second: i64, sequence: u64) -> Result<Uid> {
        let delta = second - self.epoch.seconds();
        if delta < 0 {
            return Err(Error::ClockBeforeEpoch {
                now: second,
                epoch: self.epoch.seconds(),
            });
        }
        self.layout
            .pack(delta as u64, self.data_center_id, self.worker_id, sequence)
    }
}
