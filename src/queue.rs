use crate::event::RawEvent;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

/// What `push` does when the queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Producer waits until the consumer frees a slot
    Block,
    /// The oldest queued event is discarded to make room
    DropOldest,
}

/// Bounded FIFO buffer decoupling the sensor loops from the dispatcher.
///
/// Multiple producers push, exactly one consumer pops. Ordering among
/// events pushed by a single producer is preserved; cross-producer order
/// is arrival order. Bounding the queue turns a dispatcher stall (slow
/// capture, slow sink) into explicit backpressure instead of unbounded
/// memory growth.
pub struct EventQueue {
    inner: Mutex<VecDeque<RawEvent>>,
    capacity: usize,
    policy: OverflowPolicy,
    not_empty: Notify,
    not_full: Notify,
    stats: QueueStats,
}

/// Counters for queue monitoring
#[derive(Debug, Default)]
pub struct QueueStats {
    pub events_pushed: AtomicU64,
    pub events_popped: AtomicU64,
    pub events_dropped: AtomicU64,
}

impl QueueStats {
    /// Get current statistics as a snapshot
    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            events_pushed: self.events_pushed.load(Ordering::Relaxed),
            events_popped: self.events_popped.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of queue statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    pub events_pushed: u64,
    pub events_popped: u64,
    pub events_dropped: u64,
}

impl EventQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        assert!(capacity > 0, "Event queue capacity must be greater than 0");

        debug!(
            "Created event queue with capacity {} and policy {:?}",
            capacity, policy
        );

        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
            not_empty: Notify::new(),
            not_full: Notify::new(),
            stats: QueueStats::default(),
        }
    }

    /// Append an event.
    ///
    /// With `DropOldest` this never waits: a full queue discards its head
    /// first. With `Block` the caller is suspended until a slot opens.
    pub async fn push(&self, event: RawEvent) {
        loop {
            let not_full = self.not_full.notified();
            {
                let mut queue = self.inner.lock();
                if queue.len() < self.capacity {
                    trace!("Queued {} event", event.kind.as_str());
                    queue.push_back(event);
                    self.stats.events_pushed.fetch_add(1, Ordering::Relaxed);
                    drop(queue);
                    self.not_empty.notify_one();
                    return;
                }

                if self.policy == OverflowPolicy::DropOldest {
                    let dropped = queue.pop_front();
                    queue.push_back(event);
                    self.stats.events_pushed.fetch_add(1, Ordering::Relaxed);
                    self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
                    drop(queue);
                    if let Some(dropped) = dropped {
                        warn!(
                            "Event queue full; dropped oldest {} event",
                            dropped.kind.as_str()
                        );
                    }
                    self.not_empty.notify_one();
                    return;
                }
            }

            // Block policy: wait for the consumer to free a slot. The
            // permit was requested before the capacity check, so a pop
            // between unlock and await cannot be missed.
            not_full.await;
        }
    }

    /// Remove and return the oldest event, waiting until one is available.
    /// Intended for the single dispatcher task.
    pub async fn pop(&self) -> RawEvent {
        loop {
            let not_empty = self.not_empty.notified();
            {
                let mut queue = self.inner.lock();
                if let Some(event) = queue.pop_front() {
                    self.stats.events_popped.fetch_add(1, Ordering::Relaxed);
                    drop(queue);
                    self.not_full.notify_one();
                    return event;
                }
            }

            not_empty.await;
        }
    }

    /// Non-waiting variant used when draining during shutdown
    pub fn try_pop(&self) -> Option<RawEvent> {
        let event = self.inner.lock().pop_front();
        if event.is_some() {
            self.stats.events_popped.fetch_add(1, Ordering::Relaxed);
            self.not_full.notify_one();
        }
        event
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, RawEvent};
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_fifo_order_single_producer() {
        let queue = EventQueue::new(8, OverflowPolicy::Block);

        queue.push(RawEvent::noise(75.0, false)).await;
        queue.push(RawEvent::motion()).await;
        queue.push(RawEvent::smoke()).await;

        assert_eq!(queue.pop().await.kind, EventKind::Noise);
        assert_eq!(queue.pop().await.kind, EventKind::Motion);
        assert_eq!(queue.pop().await.kind, EventKind::Smoke);
    }

    #[tokio::test]
    async fn test_per_producer_order_across_producers() {
        // Producer A pushes [e1, e2] strictly before producer B pushes
        // [f1]; pop must never yield e2 before e1.
        let queue = Arc::new(EventQueue::new(8, OverflowPolicy::Block));

        let a = Arc::clone(&queue);
        tokio::spawn(async move {
            a.push(RawEvent::high_temperature(61.0)).await;
            a.push(RawEvent::high_temperature(62.0)).await;
        })
        .await
        .unwrap();

        let b = Arc::clone(&queue);
        tokio::spawn(async move {
            b.push(RawEvent::motion()).await;
        })
        .await
        .unwrap();

        let first = queue.pop().await;
        let second = queue.pop().await;
        let third = queue.pop().await;

        assert!(matches!(
            first.measurement,
            Some(crate::event::Measurement::Celsius(c)) if c == 61.0
        ));
        assert!(matches!(
            second.measurement,
            Some(crate::event::Measurement::Celsius(c)) if c == 62.0
        ));
        assert_eq!(third.kind, EventKind::Motion);
    }

    #[tokio::test]
    async fn test_drop_oldest_discards_head() {
        let queue = EventQueue::new(2, OverflowPolicy::DropOldest);

        queue.push(RawEvent::noise(71.0, false)).await;
        queue.push(RawEvent::noise(72.0, false)).await;
        queue.push(RawEvent::noise(73.0, false)).await;

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.stats().events_dropped, 1);

        // 71.0 was the head and must be gone
        let first = queue.pop().await;
        assert!(matches!(
            first.measurement,
            Some(crate::event::Measurement::Decibels(db)) if db == 72.0
        ));
    }

    #[tokio::test]
    async fn test_block_policy_waits_for_consumer() {
        let queue = Arc::new(EventQueue::new(1, OverflowPolicy::Block));
        queue.push(RawEvent::smoke()).await;

        let producer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue.push(RawEvent::motion()).await;
            })
        };

        // The producer cannot finish while the queue is full
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished());

        assert_eq!(queue.pop().await.kind, EventKind::Smoke);
        timeout(Duration::from_secs(1), producer)
            .await
            .expect("blocked producer should resume after pop")
            .unwrap();
        assert_eq!(queue.pop().await.kind, EventKind::Motion);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(EventQueue::new(4, OverflowPolicy::Block));

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(RawEvent::smoke()).await;

        let event = timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake on push")
            .unwrap();
        assert_eq!(event.kind, EventKind::Smoke);
    }

    #[tokio::test]
    async fn test_stats_track_traffic() {
        let queue = EventQueue::new(4, OverflowPolicy::Block);
        queue.push(RawEvent::motion()).await;
        queue.push(RawEvent::smoke()).await;
        let _ = queue.pop().await;

        let stats = queue.stats();
        assert_eq!(stats.events_pushed, 2);
        assert_eq!(stats.events_popped, 1);
        assert_eq!(stats.events_dropped, 0);
    }
}
