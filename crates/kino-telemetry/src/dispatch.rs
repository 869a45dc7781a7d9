//! Ordered, non-blocking event dispatch
//!
//! Decouples event production (player callbacks) from delivery (network I/O):
//! - `enqueue` never blocks or awaits; a full queue applies the overflow policy
//! - one worker task drains the queue in FIFO order
//! - at most one `Transport::send` is in flight at any time
//! - `release` closes intake, drains within a grace period, then joins the worker

use crate::config::{DispatchConfig, OverflowPolicy};
use crate::event::EnrichedEvent;
use crate::transport::Transport;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events accepted by `enqueue`
    pub enqueued: u64,
    /// Events the transport accepted
    pub delivered: u64,
    /// Events the transport failed to deliver
    pub failed: u64,
    /// Events evicted or rejected because the queue was full or closed
    pub dropped: u64,
    /// Events still queued when the release grace period ran out
    pub abandoned: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    abandoned: AtomicU64,
}

struct Pending {
    events: VecDeque<EnrichedEvent>,
    closed: bool,
}

/// State shared between producers and the worker
struct Shared {
    pending: Mutex<Pending>,
    notify: Notify,
    counters: Counters,
}

impl Shared {
    fn pop(&self) -> Next {
        let mut pending = self.pending.lock();
        match pending.events.pop_front() {
            Some(event) => Next::Event(event),
            None if pending.closed => Next::Closed,
            None => Next::Idle,
        }
    }
}

enum Next {
    Event(EnrichedEvent),
    Idle,
    Closed,
}

struct Inner {
    shared: Arc<Shared>,
    capacity: usize,
    overflow: OverflowPolicy,
    grace: Duration,
    cancel: CancellationToken,
    /// Held for the whole drain so every `release` caller waits for the worker
    worker: AsyncMutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Last handle gone without release: stop the worker
        self.cancel.cancel();
    }
}

/// Handle to a running dispatch queue. Clones share the same queue.
#[derive(Clone)]
pub struct EventDispatchQueue {
    inner: Arc<Inner>,
}

impl EventDispatchQueue {
    /// Start the delivery worker. Must be called within a Tokio runtime.
    pub fn spawn(config: &DispatchConfig, transport: Arc<dyn Transport>) -> Self {
        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending {
                events: VecDeque::with_capacity(config.capacity.min(1024)),
                closed: false,
            }),
            notify: Notify::new(),
            counters: Counters::default(),
        });
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(run_worker(shared.clone(), transport, cancel.clone()));

        Self {
            inner: Arc::new(Inner {
                shared,
                capacity: config.capacity.max(1),
                overflow: config.overflow,
                grace: config.release_grace(),
                cancel,
                worker: AsyncMutex::new(Some(worker)),
            }),
        }
    }

    /// Queue an enriched event for delivery. Returns immediately.
    ///
    /// Fails only once the queue has been released. A full queue is not an
    /// error: the overflow policy decides which event is dropped.
    pub fn enqueue(&self, event: EnrichedEvent) -> Result<()> {
        let shared = &self.inner.shared;
        {
            let mut pending = shared.pending.lock();
            if pending.closed {
                shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                return Err(Error::QueueClosed);
            }

            if pending.events.len() >= self.inner.capacity {
                shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                match self.inner.overflow {
                    OverflowPolicy::DropNewest => {
                        warn!(sequence = event.sequence, event = event.name(), "Dispatch queue full, event dropped");
                        return Ok(());
                    }
                    OverflowPolicy::DropOldest => {
                        if let Some(evicted) = pending.events.pop_front() {
                            warn!(
                                sequence = evicted.sequence,
                                event = evicted.name(),
                                "Dispatch queue full, oldest event evicted"
                            );
                        }
                    }
                }
            }

            pending.events.push_back(event);
            shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        }
        shared.notify.notify_one();
        Ok(())
    }

    /// Number of events waiting for delivery
    pub fn len(&self) -> usize {
        self.inner.shared.pending.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once `release` has been called
    pub fn is_closed(&self) -> bool {
        self.inner.shared.pending.lock().closed
    }

    /// Snapshot of the delivery counters
    pub fn stats(&self) -> DispatchStats {
        let c = &self.inner.shared.counters;
        DispatchStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            abandoned: c.abandoned.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting events, drain for up to the grace period, then stop
    /// the worker. Idempotent and callable from any task.
    pub async fn release(&self) {
        self.inner.shared.pending.lock().closed = true;
        self.inner.shared.notify.notify_one();

        let mut slot = self.inner.worker.lock().await;
        let Some(mut worker) = slot.take() else {
            return;
        };

        let joined = match tokio::time::timeout(self.inner.grace, &mut worker).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    grace_ms = self.inner.grace.as_millis() as u64,
                    "Release grace period elapsed, abandoning queued events"
                );
                self.inner.cancel.cancel();
                worker.await
            }
        };
        match joined {
            Ok(()) => debug!("Dispatch worker stopped"),
            Err(e) => warn!(error = %e, "Dispatch worker terminated abnormally"),
        }

        let stats = self.stats();
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            dropped = stats.dropped,
            abandoned = stats.abandoned,
            "Dispatch queue released"
        );
    }
}

async fn run_worker(shared: Arc<Shared>, transport: Arc<dyn Transport>, cancel: CancellationToken) {
    loop {
        match shared.pop() {
            Next::Event(event) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        shared.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    result = transport.send(&event) => match result {
                        Ok(()) => {
                            shared.counters.delivered.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                            warn!(
                                sequence = event.sequence,
                                event = event.name(),
                                code = e.error_code(),
                                error = %e,
                                "Event delivery failed"
                            );
                        }
                    },
                }
            }
            Next::Closed => break,
            Next::Idle => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = shared.notify.notified() => {}
                }
            }
        }
    }

    let mut pending = shared.pending.lock();
    let remaining = pending.events.len() as u64;
    if remaining > 0 {
        shared.counters.abandoned.fetch_add(remaining, Ordering::Relaxed);
        pending.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::types::SessionId;
    use async_trait::async_trait;
    use chrono::Utc;

    /// Records delivered sequence numbers, optionally sleeping per event
    #[derive(Default)]
    struct Recorder {
        delivered: Mutex<Vec<u64>>,
        delay_ms: Option<fn(u64) -> u64>,
        fail_on: Option<u64>,
        in_flight: AtomicU64,
        max_in_flight: AtomicU64,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, event: &EnrichedEvent) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay_ms {
                tokio::time::sleep(Duration::from_millis(delay(event.sequence))).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on == Some(event.sequence) {
                return Err(Error::CollectorStatus { status: 500 });
            }
            self.delivered.lock().push(event.sequence);
            Ok(())
        }
    }

    /// Never completes a send
    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        async fn send(&self, _event: &EnrichedEvent) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// Panics inside the worker task
    struct Panicking;

    #[async_trait]
    impl Transport for Panicking {
        async fn send(&self, _event: &EnrichedEvent) -> Result<()> {
            panic!("collector client crashed");
        }
    }

    /// Every send takes the same time
    fn steady(_sequence: u64) -> u64 {
        150
    }

    /// Early events are the slowest to deliver
    fn slow_start(sequence: u64) -> u64 {
        (20 - sequence.min(20)) % 7
    }

    fn event(sequence: u64) -> EnrichedEvent {
        EnrichedEvent {
            sequence,
            timestamp: Utc::now(),
            vid: "vid".into(),
            token: "token".into(),
            session_id: SessionId::new(),
            player_id: None,
            stream_id: None,
            url: None,
            event: Event::Stuck { duration_ms: sequence },
        }
    }

    fn config(capacity: usize, overflow: OverflowPolicy, grace_ms: u64) -> DispatchConfig {
        DispatchConfig {
            capacity,
            overflow,
            release_grace_ms: grace_ms,
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order_with_variable_latency() {
        let recorder = Arc::new(Recorder {
            delay_ms: Some(slow_start as fn(u64) -> u64),
            ..Default::default()
        });
        let queue = EventDispatchQueue::spawn(
            &config(64, OverflowPolicy::DropOldest, 5_000),
            recorder.clone(),
        );

        for seq in 1..=20 {
            queue.enqueue(event(seq)).unwrap();
        }
        queue.release().await;

        assert_eq!(*recorder.delivered.lock(), (1..=20).collect::<Vec<_>>());
        assert_eq!(recorder.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(queue.stats().delivered, 20);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_retried() {
        let recorder = Arc::new(Recorder {
            fail_on: Some(2),
            ..Default::default()
        });
        let queue = EventDispatchQueue::spawn(
            &config(8, OverflowPolicy::DropOldest, 1_000),
            recorder.clone(),
        );

        for seq in 1..=3 {
            queue.enqueue(event(seq)).unwrap();
        }
        queue.release().await;

        assert_eq!(*recorder.delivered.lock(), vec![1, 3]);
        let stats = queue.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 2);
    }

    #[tokio::test]
    async fn test_drop_newest_when_full() {
        let queue = EventDispatchQueue::spawn(&config(2, OverflowPolicy::DropNewest, 50), Arc::new(Stalled));

        // First event is picked up by the worker and stalls in the transport
        queue.enqueue(event(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        for seq in 2..=5 {
            queue.enqueue(event(seq)).unwrap();
        }

        assert_eq!(queue.len(), 2);
        let pending: Vec<u64> = queue.inner.shared.pending.lock().events.iter().map(|e| e.sequence).collect();
        assert_eq!(pending, vec![2, 3]);
        assert_eq!(queue.stats().dropped, 2);

        queue.release().await;
    }

    #[tokio::test]
    async fn test_drop_oldest_when_full() {
        let queue = EventDispatchQueue::spawn(&config(2, OverflowPolicy::DropOldest, 50), Arc::new(Stalled));

        queue.enqueue(event(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        for seq in 2..=5 {
            queue.enqueue(event(seq)).unwrap();
        }

        let pending: Vec<u64> = queue.inner.shared.pending.lock().events.iter().map(|e| e.sequence).collect();
        assert_eq!(pending, vec![4, 5]);
        assert_eq!(queue.stats().dropped, 2);

        queue.release().await;
    }

    #[tokio::test]
    async fn test_release_abandons_after_grace() {
        let queue = EventDispatchQueue::spawn(&config(16, OverflowPolicy::DropOldest, 50), Arc::new(Stalled));
        for seq in 1..=4 {
            queue.enqueue(event(seq)).unwrap();
        }

        let started = std::time::Instant::now();
        queue.release().await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(queue.stats().abandoned, 4);
        assert!(queue.inner.worker.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_release_is_idempotent_and_closes_intake() {
        let recorder = Arc::new(Recorder::default());
        let queue = EventDispatchQueue::spawn(&config(8, OverflowPolicy::DropOldest, 1_000), recorder.clone());
        queue.enqueue(event(1)).unwrap();

        let other = queue.clone();
        let handle = tokio::spawn(async move { other.release().await });
        handle.await.unwrap();
        queue.release().await;

        assert!(queue.is_closed());
        assert!(matches!(queue.enqueue(event(2)), Err(Error::QueueClosed)));
        assert_eq!(*recorder.delivered.lock(), vec![1]);
    }

    #[tokio::test]
    async fn test_enqueue_does_not_wait_for_transport() {
        let queue = EventDispatchQueue::spawn(&config(1024, OverflowPolicy::DropOldest, 10), Arc::new(Stalled));

        let started = std::time::Instant::now();
        for seq in 1..=500 {
            queue.enqueue(event(seq)).unwrap();
        }
        assert!(started.elapsed() < Duration::from_secs(1));

        queue.release().await;
    }

    #[tokio::test]
    async fn test_concurrent_release_waits_for_drain() {
        let recorder = Arc::new(Recorder {
            delay_ms: Some(steady as fn(u64) -> u64),
            ..Recorder::default()
        });
        let queue = EventDispatchQueue::spawn(&config(8, OverflowPolicy::DropOldest, 5_000), recorder.clone());
        queue.enqueue(event(1)).unwrap();
        queue.enqueue(event(2)).unwrap();

        let other = queue.clone();
        let first = tokio::spawn(async move { other.release().await });
        tokio::task::yield_now().await;

        queue.release().await;
        assert_eq!(queue.stats().delivered, 2);
        assert_eq!(recorder.in_flight.load(Ordering::SeqCst), 0);

        first.await.unwrap();
        assert_eq!(*recorder.delivered.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_release_reports_worker_panic() {
        use crate::logging::{CallbackLayer, LogSink};
        use tracing_subscriber::layer::SubscriberExt;

        #[derive(Default)]
        struct Warnings(Mutex<Vec<String>>);

        impl LogSink for Warnings {
            fn output_log(&self, level: tracing::Level, _target: &str, message: &str) {
                if level == tracing::Level::WARN {
                    self.0.lock().push(message.to_string());
                }
            }
        }

        let warnings = Arc::new(Warnings::default());
        let subscriber = tracing_subscriber::registry().with(CallbackLayer::new(warnings.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let queue = EventDispatchQueue::spawn(&config(8, OverflowPolicy::DropOldest, 1_000), Arc::new(Panicking));
        queue.enqueue(event(1)).unwrap();
        queue.release().await;

        assert_eq!(queue.stats().delivered, 0);
        assert!(warnings
            .0
            .lock()
            .iter()
            .any(|m| m.starts_with("Dispatch worker terminated abnormally")));
    }
}
