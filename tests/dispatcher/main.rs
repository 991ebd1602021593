//! Dispatcher integration tests.
//!
//! Every test runs on a paused tokio clock, so flush deadlines, slow broker
//! acknowledgements and idle periods are exact and instantaneous.

mod support;
mod failures;
mod shutdown;
mod size_flush;
