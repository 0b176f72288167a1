//! `des-kernel` — the event-dispatch core of the des simulation kernel.
//!
//! # Tick loop
//!
//! ```text
//! init      — handler schedules the first events; keep-alive sentinel at horizon
//! loop:
//!   ① Drain    — run every ready event on the WorkerPool until none are left
//!   ② Produce  — handler converts the tick's accumulated signals into events
//!   ③ Drain    — run whatever ② scheduled for the current tick; back to ②
//!                while the handler still reports tick work
//!   ④ Advance  — pop every event at the earliest pending timestamp, move the
//!                clock there, mark them ready
//! until now >= horizon
//! ```
//!
//! The drain barrier is the only synchronisation point between ticks: all
//! events of a tick finish before the clock moves.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | (default) `MultiWorker` pool on Rayon's thread pool.   |

pub mod error;
pub mod event;
pub mod latch;
pub mod process;
pub mod worker;

#[cfg(test)]
mod tests;

pub use error::{KernelError, KernelResult};
pub use event::{Event, EventQueue};
pub use latch::{CompletionLatch, LatchGuard};
pub use process::{EventHandler, LogicalProcess, LpStats, Phase, Scheduler};
pub use worker::{SingleWorker, Task, WorkerPool, worker_pool};

#[cfg(feature = "parallel")]
pub use worker::MultiWorker;

pub use des_core::lock;
