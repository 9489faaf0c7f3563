use std::collections::HashMap;
use std::sync::Mutex;

use crate::{BitLayout, Result};

/// The capability that hands each starting instance its worker id.
///
/// Worker ids are what make concurrently-running instances of the same
/// data center produce disjoint identifiers, so in a real fleet the
/// implementation must be backed by shared coordination state, typically an
/// atomically-incrementing counter keyed by data-center id (Redis `INCR`
/// and friends). Ids are disposable: an instance takes one at startup, uses
/// it for its whole life, and never returns it - the counter ring simply
/// wraps around at the layout's worker-id capacity.
///
/// The generator treats the returned value as opaque apart from a strict
/// bounds check at startup. Backend failure is fatal: without a worker id
/// the process must not start serving.
pub trait WorkerIdAssigner {
    /// Produces a worker id for an instance of the given data center.
    ///
    /// # Errors
    ///
    /// [`crate::Error::WorkerIdAssignment`] when the backing counter cannot
    /// be reached or refuses the request.
    fn assign_worker_id(&self, data_center_id: u64, layout: &BitLayout) -> Result<u64>;
}

/// An assigner that always hands out one preconfigured worker id.
///
/// Suitable for single-instance deployments and tests, where there is
/// nothing to coordinate with.
#[derive(Clone, Copy, Debug)]
pub struct StaticWorkerIdAssigner {
    worker_id: u64,
}

impl StaticWorkerIdAssigner {
    pub const fn new(worker_id: u64) -> Self {
        Self { worker_id }
    }
}

impl WorkerIdAssigner for StaticWorkerIdAssigner {
    fn assign_worker_id(&self, _data_center_id: u64, _layout: &BitLayout) -> Result<u64> {
        Ok(self.worker_id)
    }
}

/// A process-local counter ring with the same contract as a shared counter
/// service.
///
/// Each data center gets its own counter; every assignment increments it
/// and reduces the result modulo the layout's maximum worker id, so ids
/// cycle `1, 2, .., max-1, 0, 1, ..` exactly like the external backend
/// would. Useful when several generators live in one process, and as a
/// reference for what a networked implementation must do.
#[derive(Debug, Default)]
pub struct CyclicWorkerIdAssigner {
    counters: Mutex<HashMap<u64, u64>>,
}

impl CyclicWorkerIdAssigner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkerIdAssigner for CyclicWorkerIdAssigner {
    fn assign_worker_id(&self, data_center_id: u64, layout: &BitLayout) -> Result<u64> {
        let mut counters = self.counters.lock()?;
        let counter = counters.entry(data_center_id).or_insert(0);
        *counter += 1;
        Ok(*counter % layout.max_worker_id())
    }
}
