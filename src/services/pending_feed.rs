use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::{Mutex, watch};
use tokio_stream::wrappers::WatchStream;

use crate::db::enrollments;
use crate::models::Enrollment;

pub type PendingSnapshot = Arc<Vec<Enrollment>>;

/// Push feed of every pending enrollment. Each update is the complete set,
/// never a delta; the most recent one is authoritative.
#[derive(Clone)]
pub struct PendingFeed {
    tx: Arc<watch::Sender<PendingSnapshot>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl PendingFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self {
            tx: Arc::new(tx),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Re-reads the pending set and publishes it. Refreshes are serialized so
    /// an older read can never overwrite a newer one.
    pub async fn refresh(&self, db: &SqlitePool) -> Result<usize, sqlx::Error> {
        let _guard = self.refresh_lock.lock().await;
        let pending = enrollments::fetch_pending(db).await?;
        let count = pending.len();
        self.tx.send_replace(Arc::new(pending));
        Ok(count)
    }

    pub fn snapshot(&self) -> PendingSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> PendingSubscription {
        PendingSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PendingFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live view of the pending queue. Dropping it (or calling `cancel`)
/// unsubscribes.
pub struct PendingSubscription {
    rx: watch::Receiver<PendingSnapshot>,
}

impl PendingSubscription {
    pub fn current(&mut self) -> PendingSnapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next published snapshot. `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<PendingSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn cancel(self) {}

    /// Stream starting with the current snapshot, then every later one.
    pub fn into_stream(self) -> WatchStream<PendingSnapshot> {
        WatchStream::new(self.rx)
    }
}
