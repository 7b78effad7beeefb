//! Cached `Date` header.
//!
//! Formatting the current time for every response is wasted work when the
//! value only changes once a second. [`DateCache`] keeps a rendered snapshot
//! that a background task replaces on a fixed cadence. Connections read the
//! latest snapshot without locking and never trigger a refresh themselves.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::{ArcSwap, Guard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// One rendering of the current date, in both forms a response needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSnapshot {
    value: String,
    header: Vec<u8>,
}

impl DateSnapshot {
    pub fn render(at: SystemTime) -> Self {
        let value = httpdate::fmt_http_date(at);

        let mut header = Vec::with_capacity(b"Date: \r\n".len() + value.len());
        header.extend_from_slice(b"Date: ");
        header.extend_from_slice(value.as_bytes());
        header.extend_from_slice(b"\r\n");

        Self { value, header }
    }

    /// The IMF-fixdate value, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The complete `Date: <value>\r\n` header line.
    pub fn header_line(&self) -> &[u8] {
        &self.header
    }
}

/// Shared, periodically refreshed date snapshot.
pub struct DateCache {
    current: ArcSwap<DateSnapshot>,
    clock: fn() -> SystemTime,
}

impl DateCache {
    pub fn new() -> Self {
        Self::with_clock(SystemTime::now)
    }

    /// Builds a cache that reads time from `clock` instead of the system clock.
    pub fn with_clock(clock: fn() -> SystemTime) -> Self {
        Self {
            current: ArcSwap::from_pointee(DateSnapshot::render(clock())),
            clock,
        }
    }

    /// The latest published snapshot.
    #[inline]
    pub fn snapshot(&self) -> Guard<Arc<DateSnapshot>> {
        self.current.load()
    }

    /// Re-renders the date and publishes it.
    pub fn refresh(&self) {
        let next = DateSnapshot::render((self.clock)());
        self.current.store(Arc::new(next));
    }

    /// Starts the background task that calls [`refresh`](Self::refresh) every
    /// `interval`.
    pub fn spawn_refresher(self: &Arc<Self>, interval: Duration) -> DateRefresher {
        let cache = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately and the cache is already fresh.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                cache.refresh();
                tracing::trace!(date = cache.snapshot().value(), "Date header refreshed");
            }
        });

        DateRefresher { handle }
    }
}

impl Default for DateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateCache")
            .field("current", &self.snapshot().value())
            .finish()
    }
}

/// Handle to the refresh task started by [`DateCache::spawn_refresher`].
#[derive(Debug)]
pub struct DateRefresher {
    handle: JoinHandle<()>,
}

impl DateRefresher {
    /// Stops refreshing. The cache keeps serving its last snapshot.
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}
