//! Thread-safe blocking FIFO message queue with cooperative cancellation.
//!
//! The [`queue`] module is the library proper. The remaining modules back the
//! `msgqueue` stress binary.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod queue;
pub mod stress;

pub use queue::{BlockingQueue, QueueError, QueueResult};
