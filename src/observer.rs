//! Observer Bus
//!
//! Per-host fan-out from one monitor to any number of live observers.
//!
//! Each [`Subscription`] owns its own queue. [`ObserverBus::publish`] never
//! blocks: with no subscribers the record is simply discarded, and a bounded
//! subscriber whose queue is full loses the record (counted in
//! [`ObserverBus::dropped`]). Unbounded subscribers that never drain grow
//! for the lifetime of the process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::record::Record;

/// Sending half of one subscriber queue.
#[derive(Debug)]
enum Outlet {
    Unbounded(Sender<Arc<Record>>),
    Bounded(SyncSender<Arc<Record>>),
}

/// Fan-out queue for one host's records.
#[derive(Debug)]
pub struct ObserverBus {
    host: String,
    capacity: Option<usize>,
    outlets: Mutex<Vec<Outlet>>,
    dropped: AtomicU64,
}

impl ObserverBus {
    /// Bus whose subscribers buffer without limit.
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_capacity(host, None)
    }

    /// Bus whose subscribers buffer at most `capacity` records each.
    pub fn bounded(host: impl Into<String>, capacity: usize) -> Self {
        Self::with_capacity(host, Some(capacity))
    }

    pub fn with_capacity(host: impl Into<String>, capacity: Option<usize>) -> Self {
        Self {
            host: host.into(),
            capacity,
            outlets: Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Register a new observer. It sees records published from now on.
    pub fn subscribe(&self) -> Subscription {
        let (outlet, rx) = match self.capacity {
            Some(capacity) => {
                let (tx, rx) = mpsc::sync_channel(capacity);
                (Outlet::Bounded(tx), rx)
            }
            None => {
                let (tx, rx) = mpsc::channel();
                (Outlet::Unbounded(tx), rx)
            }
        };
        self.outlets().push(outlet);

        Subscription {
            host: self.host.clone(),
            rx,
        }
    }

    /// Deliver `record` to every live subscriber without blocking.
    pub fn publish(&self, record: Record) {
        let record = Arc::new(record);
        let mut outlets = self.outlets();

        outlets.retain(|outlet| match outlet {
            Outlet::Unbounded(tx) => tx.send(Arc::clone(&record)).is_ok(),
            Outlet::Bounded(tx) => match tx.try_send(Arc::clone(&record)) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(host = %self.host, "Observer queue full, dropping record");
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            },
        });
    }

    /// Live subscribers. Dropped subscriptions are pruned on the next publish.
    pub fn subscriber_count(&self) -> usize {
        self.outlets().len()
    }

    /// Records lost to full subscriber queues.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn outlets(&self) -> MutexGuard<'_, Vec<Outlet>> {
        self.outlets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Consuming end held by one observer.
#[derive(Debug)]
pub struct Subscription {
    host: String,
    rx: Receiver<Arc<Record>>,
}

impl Subscription {
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Next pending record, or `None` if nothing is queued. Never blocks.
    pub fn try_consume(&self) -> Option<Arc<Record>> {
        self.rx.try_recv().ok()
    }

    /// All records queued so far, oldest first.
    pub fn drain(&self) -> Vec<Arc<Record>> {
        self.rx.try_iter().collect()
    }
}
