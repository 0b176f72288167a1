use des_core::{EntityId, Tick};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    /// An event was scheduled before the current clock.  Fatal: the owning
    /// logical process aborts.
    #[error("causality violation: {owner} scheduled an event at {ts} while the clock is at {now}")]
    CausalityViolation {
        ts:    Tick,
        now:   Tick,
        owner: EntityId,
    },

    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

pub type KernelResult<T> = Result<T, KernelError>;
