//! Blocking Queue System for Producer/Consumer Hand-off
//!
//! This module provides the synchronisation primitive underlying
//! producer/consumer pipelines: an unbounded, thread-safe FIFO queue where
//! consumers block until work arrives and a cooperative cancel releases every
//! blocked consumer.
//!
//! # Architecture
//!
//! - **BlockingQueue**: the queue itself, generic over the message type
//! - **QueueError**: the `Cancelled` signal returned by blocking pops
//!
//! # Usage
//!
//! ```rust
//! use msgqueue::queue::{BlockingQueue, QueueError};
//!
//! let queue = BlockingQueue::new();
//! assert_eq!(queue.try_pop(), None);
//!
//! queue.push_batch([1, 2]);
//! assert_eq!(queue.try_pop(), Some(1));
//! assert_eq!(queue.try_pop(), Some(2));
//!
//! queue.push(3);
//! queue.cancel();
//! assert_eq!(queue.pop_wait(), Ok(3));
//! assert_eq!(queue.pop_wait(), Err(QueueError::Cancelled));
//! ```

pub mod blocking;
pub mod error;

// Re-export main types for convenience
pub use blocking::BlockingQueue;
pub use error::{QueueError, QueueResult};

#[cfg(test)]
mod tests;
