//! Paginated inventory retrieval.
//!
//! `fetch_all` turns a node's paged listing endpoint into a lazy stream of
//! [`ObjectRecord`]s. Pages are requested strictly sequentially from offset
//! 0: the remote `total` is re-read on every page and pages are not
//! guaranteed to reflect a single consistent snapshot, so out-of-order or
//! speculative prefetch would widen the inconsistency window.
//!
//! A failed page is retried indefinitely at the same offset. One silently
//! lost identifier corrupts the downstream set comparison, so completeness is
//! deliberately prioritized over liveness; callers bound the loop with an
//! overall timeout and/or the cancellation token, which is observed between
//! attempts.

use crate::error::{ReconError, ReconResult};
use fedscan_client::{NodeClient, ObjectRecord};
use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Production default page size.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Fetcher tuning knobs.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Records requested per page.
    pub page_size: u64,
    /// Base delay between retries of a failed page.
    pub retry_base: Duration,
    /// Cap on the retry delay.
    pub retry_max: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            retry_base: Duration::from_millis(500),
            retry_max: Duration::from_secs(15),
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_base
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
            .min(self.retry_max)
    }
}

/// Fetch progress, published after every successful page so a caller can
/// report percentage complete without blocking on full completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Records fetched so far.
    pub fetched: u64,
    /// Total known from the most recent successful page.
    pub total: u64,
}

/// Pagination cursor. Owned exclusively by the fetcher; `offset` is
/// monotonically non-decreasing across successful pages.
#[derive(Debug, Clone, Copy)]
struct PageCursor {
    offset: u64,
    page_size: u64,
    /// Server-reported total from the most recent successful page; never
    /// trusted across pages since remote writes may land mid-fetch.
    total: Option<u64>,
}

impl PageCursor {
    fn new(page_size: u64) -> Self {
        Self {
            offset: 0,
            page_size,
            total: None,
        }
    }

    fn advance(&mut self, returned: u64, total: u64) {
        self.offset += returned;
        self.total = Some(total);
    }

    fn exhausted(&self) -> bool {
        match self.total {
            Some(total) => self.offset >= total,
            None => false,
        }
    }
}

struct FetchState {
    client: NodeClient,
    node_filter: Option<String>,
    config: FetchConfig,
    cancel: CancellationToken,
    cursor: PageCursor,
    buffered: VecDeque<ObjectRecord>,
    fetched: u64,
    done: bool,
    progress: watch::Sender<Progress>,
}

impl FetchState {
    /// Fetch the next page, retrying indefinitely at the current offset.
    /// Returns an error only when cancellation is observed.
    async fn next_page(&mut self) -> ReconResult<()> {
        let mut attempt: u32 = 0;
        let page = loop {
            if self.cancel.is_cancelled() {
                return Err(ReconError::Cancelled);
            }
            match self
                .client
                .list_objects(
                    self.cursor.offset,
                    self.cursor.page_size,
                    self.node_filter.as_deref(),
                )
                .await
            {
                Ok(page) if page.records.is_empty() && self.cursor.offset < page.total => {
                    // The node claims more records exist but returned none.
                    // Accepting it would spin the cursor in place forever;
                    // treat as transient and retry the same offset.
                    warn!(
                        node = self.client.base_url(),
                        offset = self.cursor.offset,
                        total = page.total,
                        attempt = attempt + 1,
                        "Empty page below reported total, retrying"
                    );
                }
                Ok(page) => break page,
                Err(error) => {
                    warn!(
                        node = self.client.base_url(),
                        offset = self.cursor.offset,
                        attempt = attempt + 1,
                        error = %error,
                        "Page fetch failed, retrying at same offset"
                    );
                }
            }

            let backoff = self.config.backoff_for(attempt);
            tokio::select! {
                () = self.cancel.cancelled() => return Err(ReconError::Cancelled),
                () = tokio::time::sleep(backoff) => {}
            }
            attempt = attempt.saturating_add(1);
        };

        let returned = page.records.len() as u64;
        self.cursor.advance(returned, page.total);
        self.fetched += returned;
        self.done = self.cursor.exhausted();

        debug!(
            node = self.client.base_url(),
            fetched = self.fetched,
            total = page.total,
            "Retrieved inventory page"
        );
        let _ = self.progress.send(Progress {
            fetched: self.fetched,
            total: page.total,
        });

        self.buffered.extend(page.records);
        Ok(())
    }
}

/// Retrieve a node's full object inventory as a lazy record stream.
///
/// Restartable, not resumable: a fresh call always starts from offset 0.
/// The paired [`watch::Receiver`] publishes [`Progress`] after every
/// successful page. If the endpoint reports `total == 0`, the stream is
/// empty and the fetch succeeds trivially.
pub fn fetch_all(
    client: NodeClient,
    node_filter: Option<String>,
    config: FetchConfig,
    cancel: CancellationToken,
) -> (
    impl Stream<Item = ReconResult<ObjectRecord>> + Send,
    watch::Receiver<Progress>,
) {
    let (progress_tx, progress_rx) = watch::channel(Progress::default());
    let state = FetchState {
        cursor: PageCursor::new(config.page_size.max(1)),
        client,
        node_filter,
        config,
        cancel,
        buffered: VecDeque::new(),
        fetched: 0,
        done: false,
        progress: progress_tx,
    };

    let stream = stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(record) = state.buffered.pop_front() {
                return Ok(Some((record, state)));
            }
            if state.done {
                return Ok(None);
            }
            state.next_page().await?;
        }
    });

    (stream, progress_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advances_by_returned_count() {
        let mut cursor = PageCursor::new(100);
        cursor.advance(100, 250);
        assert_eq!(cursor.offset, 100);
        assert!(!cursor.exhausted());

        // Short final page: advance by what actually came back.
        cursor.advance(100, 250);
        cursor.advance(50, 250);
        assert_eq!(cursor.offset, 250);
        assert!(cursor.exhausted());
    }

    #[test]
    fn cursor_uses_freshest_total() {
        let mut cursor = PageCursor::new(100);
        cursor.advance(100, 500);
        assert!(!cursor.exhausted());

        // Total shrank between pages; the freshest value decides.
        cursor.advance(20, 120);
        assert!(cursor.exhausted());
    }

    #[test]
    fn zero_total_is_exhausted_immediately() {
        let mut cursor = PageCursor::new(100);
        cursor.advance(0, 0);
        assert!(cursor.exhausted());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let config = FetchConfig {
            page_size: 10,
            retry_base: Duration::from_millis(500),
            retry_max: Duration::from_secs(2),
        };
        assert_eq!(config.backoff_for(0), Duration::from_millis(500));
        assert_eq!(config.backoff_for(1), Duration::from_secs(1));
        assert_eq!(config.backoff_for(2), Duration::from_secs(2));
        assert_eq!(config.backoff_for(10), Duration::from_secs(2)); // capped
    }

    #[test]
    fn page_size_floor_is_one() {
        let config = FetchConfig::default().with_page_size(0);
        assert_eq!(config.page_size, 1);
    }
}
