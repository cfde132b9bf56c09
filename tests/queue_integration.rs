//! End-to-end producer/consumer pipelines built on the public queue API

use msgqueue::{BlockingQueue, QueueError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Work units are boxed closures: move-only, never cloned
type Job = Box<dyn FnOnce() -> usize + Send>;

#[test]
fn test_worker_pool_runs_every_job_once() {
    init_logging();
    let jobs: Arc<BlockingQueue<Job>> = Arc::new(BlockingQueue::new());
    let executed = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let jobs = Arc::clone(&jobs);
            thread::spawn(move || {
                let mut total = 0;
                loop {
                    match jobs.pop_wait() {
                        Ok(job) => total += job(),
                        Err(QueueError::Cancelled) => return total,
                    }
                }
            })
        })
        .collect();

    for n in 0..1_000 {
        let executed = Arc::clone(&executed);
        jobs.push(Box::new(move || {
            executed.fetch_add(1, Ordering::Relaxed);
            n
        }));
    }
    jobs.cancel();

    let total: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(executed.load(Ordering::Relaxed), 1_000);
    assert_eq!(total, (0..1_000).sum::<usize>());
}

#[test]
fn test_two_stage_pipeline_preserves_order() {
    init_logging();
    let parsed: BlockingQueue<u32> = BlockingQueue::new();
    let rendered: BlockingQueue<String> = BlockingQueue::new();
    let input: Vec<String> = (0..500).map(|n| n.to_string()).collect();

    let output: Vec<String> = thread::scope(|scope| {
        scope.spawn(|| {
            for line in &input {
                parsed.push(line.parse().unwrap());
            }
            parsed.cancel();
        });
        scope.spawn(|| {
            while let Ok(batch) = parsed.pop_wait_batch() {
                rendered.push_batch(batch.into_iter().map(|n| format!("#{}", n)));
            }
            rendered.cancel();
        });

        let mut output = Vec::new();
        while let Ok(line) = rendered.pop_wait() {
            output.push(line);
        }
        output
    });

    let expected: Vec<String> = (0..500).map(|n| format!("#{}", n)).collect();
    assert_eq!(output, expected);
}

#[test]
fn test_shutdown_drains_remaining_after_join() {
    init_logging();
    let mut queue = Arc::new(BlockingQueue::new());

    let producers: Vec<_> = (0..3)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut pending: VecDeque<_> = (0..10).map(|n| (p, n)).collect();
                queue.append(&mut pending);
                assert!(pending.is_empty());
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    // Every other handle is gone, so exclusive access is available
    let remaining = Arc::get_mut(&mut queue).unwrap().drain_remaining();
    assert_eq!(remaining.len(), 30);
    for p in 0..3 {
        let seqs: Vec<_> = remaining.iter().filter(|m| m.0 == p).map(|m| m.1).collect();
        assert_eq!(seqs, (0..10).collect::<Vec<_>>());
    }
}

#[test]
fn test_late_consumers_observe_cancellation_immediately() {
    let queue: BlockingQueue<u8> = BlockingQueue::new();
    queue.cancel();
    queue.cancel();

    thread::scope(|scope| {
        let late = scope.spawn(|| queue.pop_wait_batch());
        assert_eq!(late.join().unwrap(), Err(QueueError::Cancelled));
    });
    assert!(queue.is_cancelled());
}
