//! Blocking Message Queue Implementation
//!
//! Unbounded FIFO queue that hands messages from any number of producer
//! threads to one or more consumer threads. Consumers may block until a
//! message (or a whole batch) is available; [`BlockingQueue::cancel`]
//! releases every blocked consumer.
//!
//! All state lives behind a single `parking_lot::Mutex` paired with a
//! `parking_lot::Condvar`. Blocking pops re-check their predicate in a loop,
//! so spurious wakeups and races with other consumers are harmless.
//!
//! Cancellation is checked as the wait-exit condition only: a cancelled queue
//! still hands out whatever it holds before reporting
//! [`QueueError::Cancelled`], and it keeps accepting pushes.

use crate::queue::error::{QueueError, QueueResult};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::mem;

/// State guarded by the queue mutex
struct QueueState<T> {
    /// Buffered messages, oldest first
    buffer: VecDeque<T>,
    /// Set once by `cancel`, never cleared
    cancelled: bool,
}

/// Thread-safe blocking FIFO queue with cooperative cancellation
///
/// Share it between threads by reference (scoped threads) or through an
/// `Arc`. Dropping the queue cancels it.
///
/// ```rust
/// use msgqueue::queue::{BlockingQueue, QueueError};
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BlockingQueue::new());
///
/// let consumer = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || {
///         let mut received = Vec::new();
///         loop {
///             match queue.pop_wait() {
///                 Ok(message) => received.push(message),
///                 Err(QueueError::Cancelled) => break,
///             }
///         }
///         received
///     })
/// };
///
/// queue.push(1);
/// queue.push_batch(vec![2, 3]);
/// while !queue.is_empty() {
///     thread::yield_now();
/// }
/// queue.cancel();
///
/// assert_eq!(consumer.join().unwrap(), vec![1, 2, 3]);
/// ```
pub struct BlockingQueue<T> {
    state: Mutex<QueueState<T>>,
    notifier: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Create an empty, active queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                buffer: VecDeque::new(),
                cancelled: false,
            }),
            notifier: Condvar::new(),
        }
    }

    // Producer Interface

    /// Push a message to the tail of the queue and wake one waiting consumer
    ///
    /// Always succeeds, including after [`cancel`](Self::cancel).
    pub fn push(&self, message: T) {
        let mut state = self.state.lock();
        state.buffer.push_back(message);
        self.notifier.notify_one();
    }

    /// Push a sequence of messages as one contiguous block
    ///
    /// No other producer's message can land between elements of the batch.
    /// Wakes one waiting consumer.
    pub fn push_batch<I>(&self, messages: I)
    where
        I: IntoIterator<Item = T>,
    {
        // Collect outside the lock so the iterator runs unsynchronised
        let mut batch: VecDeque<T> = messages.into_iter().collect();
        self.append(&mut batch);
    }

    /// Move every message out of `messages` onto the tail of the queue
    ///
    /// `messages` is left empty. The move is atomic with respect to other
    /// pushes and wakes one waiting consumer.
    pub fn append(&self, messages: &mut VecDeque<T>) {
        let count = messages.len();
        let mut state = self.state.lock();
        state.buffer.append(messages);
        self.notifier.notify_one();
        log::trace!("Appended batch of {} messages, queue size: {}", count, state.buffer.len());
    }

    // Status

    /// Check if the queue is empty
    ///
    /// Advisory only: another thread may change the answer as soon as the
    /// lock is released.
    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }

    /// Get the current number of buffered messages (advisory, see `is_empty`)
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Check if the queue has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    // Consumer Interface

    /// Pop the oldest message without blocking
    ///
    /// Returns `None` if the queue is empty. Cancellation is never reported
    /// here.
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().buffer.pop_front()
    }

    /// Pop the oldest message, blocking until one is available
    ///
    /// Returns [`QueueError::Cancelled`] once the queue is cancelled and
    /// empty. Messages still buffered at cancellation are returned first.
    pub fn pop_wait(&self) -> QueueResult<T> {
        let mut state = self.wait_for_messages()?;
        state.buffer.pop_front().ok_or(QueueError::Cancelled)
    }

    /// Take every buffered message, blocking until at least one is available
    ///
    /// The returned batch is in FIFO order and the queue is left empty.
    /// Fails with [`QueueError::Cancelled`] under the same condition as
    /// [`pop_wait`](Self::pop_wait).
    pub fn pop_wait_batch(&self) -> QueueResult<VecDeque<T>> {
        let mut state = self.wait_for_messages()?;
        let batch = mem::take(&mut state.buffer);
        log::trace!("Popped batch of {} messages", batch.len());
        Ok(batch)
    }

    /// Cancel the queue and wake every blocked consumer
    ///
    /// Idempotent. Pushes keep working after cancellation; only blocking pops
    /// change behaviour once the queue runs dry.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if !state.cancelled {
            log::debug!("Cancelling queue with {} pending messages", state.buffer.len());
        }
        state.cancelled = true;
        self.notifier.notify_all();
    }

    // Shutdown

    /// Remove every buffered message without locking
    ///
    /// `&mut self` proves no other thread can reach the queue, which makes
    /// this safe to use during final shutdown, e.g. through `Arc::get_mut`
    /// once every producer and consumer has been joined.
    pub fn drain_remaining(&mut self) -> VecDeque<T> {
        mem::take(&mut self.state.get_mut().buffer)
    }

    /// Consume the queue and return the messages it still holds
    pub fn into_remaining(mut self) -> VecDeque<T> {
        self.drain_remaining()
    }

    /// Block until the buffer is non-empty or the queue is cancelled
    ///
    /// Returns the held guard when there is at least one message to take.
    fn wait_for_messages(&self) -> QueueResult<MutexGuard<'_, QueueState<T>>> {
        let mut state = self.state.lock();
        while state.buffer.is_empty() && !state.cancelled {
            // Releases the mutex while parked
            self.notifier.wait(&mut state);
        }
        if state.buffer.is_empty() {
            return Err(QueueError::Cancelled);
        }
        Ok(state)
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for BlockingQueue<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockingQueue")
            .field("len", &state.buffer.len())
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_creation() {
        let queue: BlockingQueue<u32> = BlockingQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(!queue.is_cancelled());
    }

    #[test]
    fn test_push_try_pop() {
        let queue = BlockingQueue::new();
        assert_eq!(queue.try_pop(), None);

        queue.push(1);
        queue.push(2);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_append_leaves_source_empty() {
        let mut queue = BlockingQueue::new();
        let mut batch: VecDeque<_> = vec!["a", "b", "c"].into();

        queue.append(&mut batch);

        assert!(batch.is_empty());
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain_remaining(), ["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancelled_queue_drains_before_signalling() {
        let queue = BlockingQueue::new();
        queue.push(3);
        queue.cancel();

        assert_eq!(queue.pop_wait(), Ok(3));
        assert_eq!(queue.pop_wait(), Err(QueueError::Cancelled));
    }

    #[test]
    fn test_debug_output() {
        let queue = BlockingQueue::new();
        queue.push(String::from("message"));
        assert_eq!(format!("{:?}", queue), "BlockingQueue { len: 1, cancelled: false }");
    }
}
