//! Batching and dispatch.
//!
//! ```text
//! inbound event ──► serialize ──► Batch ──(full | deadline)──► PublishTask
//!                                   ▲                              │
//!                                   └─ fresh empty batch           ▼
//!                                                      WorkerPool ─► Topic
//!                                                                   │
//!                       FlushTimer ◄──────── rearm on completion ───┘
//! ```
//!
//! The dispatch loop owns the open batch and waits on whichever comes first:
//! the next inbound event or the flush deadline. A full batch is flushed at
//! once; a deadline flushes whatever is buffered, or just rearms the timer
//! when nothing is. Publish tasks rearm the timer when they finish, so the
//! next time-based flush is measured from the end of the previous publish.

mod batch;
mod dispatcher;
mod in_flight;
mod stats;
mod task;
mod timer;

pub use batch::Batch;
pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use in_flight::{InFlight, InFlightGuard};
pub use stats::DispatchStats;
pub use task::{publish_batch, FlushTrigger, PublishSummary};
pub use timer::FlushTimer;
