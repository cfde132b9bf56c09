//! Basic single-threaded queue behaviour

use crate::queue::{BlockingQueue, QueueError};
use std::sync::Arc;

#[test]
fn test_empty_queue_try_pop() {
    let queue: BlockingQueue<u32> = BlockingQueue::new();

    assert!(queue.is_empty());
    assert_eq!(queue.try_pop(), None); // Empty queue yields no value, not an error
}

#[test]
fn test_queue_fifo_ordering() {
    let queue = BlockingQueue::new();

    queue.push("first".to_string());
    queue.push("second".to_string());
    queue.push("third".to_string());
    assert_eq!(queue.len(), 3);

    assert_eq!(queue.pop_wait().unwrap(), "first");
    assert_eq!(queue.try_pop().unwrap(), "second");
    assert_eq!(queue.pop_wait().unwrap(), "third");
    assert!(queue.is_empty());
}

#[test]
fn test_scenario_try_pop_then_cancel() {
    let queue = BlockingQueue::new();
    assert_eq!(queue.try_pop(), None);

    queue.push_batch(vec![1, 2]);
    assert_eq!(queue.try_pop(), Some(1));
    assert_eq!(queue.try_pop(), Some(2));
    assert_eq!(queue.try_pop(), None);

    queue.push(3);
    queue.cancel();
    assert_eq!(queue.pop_wait(), Ok(3));
    assert_eq!(queue.pop_wait(), Err(QueueError::Cancelled));
}

#[test]
fn test_move_only_messages() {
    // Box is neither Copy nor required to be Clone
    struct Job(Box<u64>);

    let queue = BlockingQueue::new();
    queue.push(Job(Box::new(7)));

    let job = queue.pop_wait().unwrap();
    assert_eq!(*job.0, 7);
}

#[test]
fn test_drain_remaining_returns_everything_in_order() {
    let mut queue = BlockingQueue::new();
    queue.push(1);
    queue.push_batch([2, 3]);
    queue.push(4);

    let remaining = queue.drain_remaining();
    assert_eq!(remaining, [1, 2, 3, 4]);
    assert!(queue.is_empty());
    assert!(queue.drain_remaining().is_empty());
}

#[test]
fn test_drain_remaining_through_arc() {
    let mut queue = Arc::new(BlockingQueue::new());
    let producer = Arc::clone(&queue);
    std::thread::spawn(move || {
        producer.push("late");
    })
    .join()
    .unwrap();

    // Only reachable once every other handle is gone
    let queue = Arc::get_mut(&mut queue).expect("no other handles remain");
    assert_eq!(queue.drain_remaining(), ["late"]);
}

#[test]
fn test_into_remaining() {
    let queue = BlockingQueue::new();
    queue.push('a');
    queue.push('b');
    queue.cancel();

    assert_eq!(queue.into_remaining(), ['a', 'b']);
}

#[test]
fn test_drop_releases_pending_messages() {
    let message = Arc::new(());
    {
        let queue = BlockingQueue::new();
        queue.push(Arc::clone(&message));
        queue.push(Arc::clone(&message));
        assert_eq!(Arc::strong_count(&message), 3);
    }
    assert_eq!(Arc::strong_count(&message), 1);
}

#[test]
fn test_default_is_active_and_empty() {
    let queue: BlockingQueue<()> = BlockingQueue::default();
    assert!(queue.is_empty());
    assert!(!queue.is_cancelled());
}
