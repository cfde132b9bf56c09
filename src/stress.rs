//! Producer/Consumer Stress Harness
//!
//! Drives a [`BlockingQueue`] with a configurable number of producer and
//! consumer threads and checks that every message arrives exactly once.
//!
//! Shutdown follows the queue's intended lifecycle: producers are joined,
//! the queue is cancelled (consumers keep draining until it runs dry), the
//! consumers are joined, and finally the queue is unwrapped to confirm
//! nothing was left behind.

use crate::config::{ConsumeMode, StressConfig};
use crate::queue::{BlockingQueue, QueueError};
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A unit of work handed from a producer to a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub producer: usize,
    pub sequence: usize,
}

/// Per-consumer results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerStats {
    pub consumer_id: usize,
    /// Messages received
    pub messages: u64,
    /// Successful blocking pops (equals `messages` in single mode)
    pub wakeups: u64,
}

impl ConsumerStats {
    fn new(consumer_id: usize) -> Self {
        Self {
            consumer_id,
            messages: 0,
            wakeups: 0,
        }
    }

    /// Average messages taken per successful pop
    pub fn average_batch_size(&self) -> f64 {
        if self.wakeups == 0 {
            0.0
        } else {
            self.messages as f64 / self.wakeups as f64
        }
    }
}

/// Outcome of a stress run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub config: StressConfig,
    pub messages_sent: u64,
    pub messages_received: u64,
    /// Messages found in the queue after every consumer exited
    pub messages_left: u64,
    pub consumers: Vec<ConsumerStats>,
    pub elapsed: Duration,
}

impl StressReport {
    /// Received messages per second over the whole run
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.messages_received as f64 / seconds
        } else {
            0.0
        }
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Producers: {} | Consumers: {} | Batch size: {} | Consume: {:?}",
            self.config.producers, self.config.consumers, self.config.batch_size, self.config.consume_mode
        )];
        lines.push(format!(
            "Sent: {} | Received: {} | Left: {} | Elapsed: {:.3}s | Throughput: {:.0} msg/s",
            self.messages_sent,
            self.messages_received,
            self.messages_left,
            self.elapsed.as_secs_f64(),
            self.throughput()
        ));
        for consumer in &self.consumers {
            lines.push(format!(
                "  consumer {:>3}: {} messages, {} wakeups, avg batch {:.1}",
                consumer.consumer_id,
                consumer.messages,
                consumer.wakeups,
                consumer.average_batch_size()
            ));
        }
        lines.join("\n")
    }
}

/// Tracks which messages have been delivered across all consumers
struct DeliveryLedger {
    seen: Vec<AtomicBool>,
    messages_per_producer: usize,
}

impl DeliveryLedger {
    fn new(config: &StressConfig) -> Self {
        Self {
            seen: (0..config.total_messages()).map(|_| AtomicBool::new(false)).collect(),
            messages_per_producer: config.messages_per_producer,
        }
    }

    /// Record a delivery, failing on duplicates or unknown messages
    fn record(&self, item: WorkItem) -> Result<()> {
        let slot = item.producer * self.messages_per_producer + item.sequence;
        let seen = self
            .seen
            .get(slot)
            .with_context(|| format!("Unexpected message {:?}", item))?;
        if seen.swap(true, Ordering::AcqRel) {
            anyhow::bail!("Message {:?} delivered more than once", item);
        }
        Ok(())
    }

    fn missing(&self) -> usize {
        self.seen.iter().filter(|seen| !seen.load(Ordering::Acquire)).count()
    }
}

/// Per-consumer view used to check that each producer's messages arrive in order
struct OrderTracker {
    next_minimum: Vec<usize>,
}

impl OrderTracker {
    fn new(producers: usize) -> Self {
        Self {
            next_minimum: vec![0; producers],
        }
    }

    fn check(&mut self, item: WorkItem) -> Result<()> {
        let minimum = self
            .next_minimum
            .get_mut(item.producer)
            .with_context(|| format!("Unknown producer {}", item.producer))?;
        if item.sequence < *minimum {
            anyhow::bail!(
                "Producer {} message {} arrived after a later message",
                item.producer,
                item.sequence
            );
        }
        *minimum = item.sequence + 1;
        Ok(())
    }
}

/// Run a stress test with the given topology
pub fn run(config: &StressConfig) -> Result<StressReport> {
    config.validate()?;
    log::info!(
        "Starting stress run: {} producers x {} messages, {} consumers ({:?})",
        config.producers,
        config.messages_per_producer,
        config.consumers,
        config.consume_mode
    );

    let queue = Arc::new(BlockingQueue::new());
    let ledger = Arc::new(DeliveryLedger::new(config));
    let (stats_sender, stats_receiver) = crossbeam_channel::unbounded();

    let consumers = (0..config.consumers)
        .map(|id| spawn_consumer(id, config, Arc::clone(&queue), Arc::clone(&ledger), stats_sender.clone()))
        .collect::<Result<Vec<_>>>()
        .inspect_err(|_| queue.cancel())?;
    drop(stats_sender);

    let start = Instant::now();
    let producers = (0..config.producers)
        .map(|id| spawn_producer(id, config, Arc::clone(&queue)))
        .collect::<Result<Vec<_>>>()
        .inspect_err(|_| queue.cancel())?;

    let mut failures = Vec::new();
    for (id, producer) in producers.into_iter().enumerate() {
        if producer.join().is_err() {
            failures.push(format!("producer {}: panicked", id));
        }
    }
    log::debug!("All producers finished, {} messages still queued", queue.len());

    // Consumers drain whatever is left before observing the cancellation
    queue.cancel();

    for (id, consumer) in consumers.into_iter().enumerate() {
        match consumer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => failures.push(format!("consumer {}: {:#}", id, e)),
            Err(_) => failures.push(format!("consumer {}: panicked", id)),
        }
    }
    let elapsed = start.elapsed();

    let mut consumer_stats: Vec<ConsumerStats> = stats_receiver.iter().collect();
    consumer_stats.sort_by_key(|stats| stats.consumer_id);

    let messages_left = match Arc::try_unwrap(queue) {
        Ok(queue) => queue.into_remaining().len() as u64,
        Err(_) => anyhow::bail!("Queue still shared after all threads were joined"),
    };

    if !failures.is_empty() {
        anyhow::bail!("Stress run failed: {}", failures.join("; "));
    }

    let report = StressReport {
        config: config.clone(),
        messages_sent: config.total_messages() as u64,
        messages_received: consumer_stats.iter().map(|stats| stats.messages).sum(),
        messages_left,
        consumers: consumer_stats,
        elapsed,
    };

    let missing = ledger.missing();
    if missing > 0 || report.messages_received != report.messages_sent {
        anyhow::bail!(
            "Stress run lost messages: sent {}, received {}, missing {}",
            report.messages_sent,
            report.messages_received,
            missing
        );
    }

    log::info!(
        "Stress run complete: {} messages in {:.3}s ({:.0} msg/s)",
        report.messages_received,
        elapsed.as_secs_f64(),
        report.throughput()
    );
    Ok(report)
}

fn spawn_producer(id: usize, config: &StressConfig, queue: Arc<BlockingQueue<WorkItem>>) -> Result<JoinHandle<()>> {
    let messages = config.messages_per_producer;
    let batch_size = config.batch_size;

    thread::Builder::new()
        .name(format!("producer-{}", id))
        .spawn(move || {
            let items = (0..messages).map(|sequence| WorkItem { producer: id, sequence });
            if batch_size == 1 {
                items.for_each(|item| queue.push(item));
            } else {
                let mut pending = VecDeque::with_capacity(batch_size);
                for item in items {
                    pending.push_back(item);
                    if pending.len() == batch_size {
                        queue.append(&mut pending);
                    }
                }
                queue.append(&mut pending);
            }
            log::debug!("Producer {} finished after {} messages", id, messages);
        })
        .with_context(|| format!("Failed to spawn producer {}", id))
}

fn spawn_consumer(
    id: usize,
    config: &StressConfig,
    queue: Arc<BlockingQueue<WorkItem>>,
    ledger: Arc<DeliveryLedger>,
    stats_sender: Sender<ConsumerStats>,
) -> Result<JoinHandle<Result<()>>> {
    let mode = config.consume_mode;
    let producers = config.producers;

    thread::Builder::new()
        .name(format!("consumer-{}", id))
        .spawn(move || {
            let mut stats = ConsumerStats::new(id);
            let mut order = OrderTracker::new(producers);
            let mut receive = |item: WorkItem| -> Result<()> {
                order.check(item)?;
                ledger.record(item)
            };

            let outcome = loop {
                let received = match mode {
                    ConsumeMode::Single => queue.pop_wait().map(|item| receive(item).map(|()| 1)),
                    ConsumeMode::Batch => queue.pop_wait_batch().map(|batch| {
                        let count = batch.len() as u64;
                        batch.into_iter().try_for_each(&mut receive).map(|()| count)
                    }),
                };
                match received {
                    Ok(Ok(count)) => {
                        stats.messages += count;
                        stats.wakeups += 1;
                    }
                    Ok(Err(e)) => break Err(e),
                    Err(QueueError::Cancelled) => break Ok(()),
                }
            };

            log::debug!("Consumer {} exiting after {} messages", id, stats.messages);
            // The receiver outlives every consumer
            let _ = stats_sender.send(stats);
            outcome
        })
        .with_context(|| format!("Failed to spawn consumer {}", id))
}
