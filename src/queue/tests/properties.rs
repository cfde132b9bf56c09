//! Property-based tests for ordering guarantees

use crate::queue::{BlockingQueue, QueueError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Push {
    One(i32),
    Many(Vec<i32>),
}

fn push_strategy() -> impl Strategy<Value = Push> {
    prop_oneof![
        any::<i32>().prop_map(Push::One),
        prop::collection::vec(any::<i32>(), 0..8).prop_map(Push::Many),
    ]
}

proptest! {
    #[test]
    fn prop_pops_follow_push_order(pushes in prop::collection::vec(push_strategy(), 0..64)) {
        let queue = BlockingQueue::new();
        let mut expected = Vec::new();

        for push in pushes {
            match push {
                Push::One(value) => {
                    expected.push(value);
                    queue.push(value);
                }
                Push::Many(values) => {
                    expected.extend(values.iter().copied());
                    queue.push_batch(values);
                }
            }
        }
        prop_assert_eq!(queue.len(), expected.len());

        queue.cancel();
        let mut popped = Vec::new();
        loop {
            match queue.pop_wait() {
                Ok(value) => popped.push(value),
                Err(QueueError::Cancelled) => break,
            }
        }
        prop_assert_eq!(popped, expected);
    }

    #[test]
    fn prop_batch_pop_matches_single_pops(values in prop::collection::vec(any::<u16>(), 1..64)) {
        let singles = BlockingQueue::new();
        let batched = BlockingQueue::new();
        for value in &values {
            singles.push(*value);
            batched.push(*value);
        }

        let one_by_one: Vec<_> = std::iter::from_fn(|| singles.try_pop()).collect();
        let batch: Vec<_> = batched.pop_wait_batch().unwrap().into_iter().collect();
        prop_assert_eq!(one_by_one, batch);
    }
}
