//! The summary queue: persisted web pages waiting to be summarized or read.
//!
//! Records start `Pending`, become `Ready` once the summarizer fills in their
//! title and summary, and are deleted after delivery. Two backends implement
//! [`ReadyQueue`], the view the delivery driver needs:
//!
//! - [`SummaryQueue`]: the local SQLite queue, which also owns summarization
//! - [`remote::RemoteQueue`]: a client for the `/v1/webpages` HTTP API

pub mod migrations;
pub mod remote;
pub mod store;

use tracing::{info, instrument, warn};

use crate::errors::SummaryError;
use crate::models::{validate_url, Ratio, RecordState, WebpageRecord};
use crate::summarizer::Summarize;
use store::WebpageStore;

/// Ready records and deletion, as seen by the delivery driver.
pub trait ReadyQueue {
    /// All ready records in insertion order.
    async fn list_ready(&self) -> Result<Vec<WebpageRecord>, SummaryError>;

    /// Remove the record for `url`. Absent urls are not an error.
    async fn delete(&self, url: &str) -> Result<(), SummaryError>;

    /// Remember that `url` was read in full, so it is not offered again
    /// before its deletion succeeds, even by a later process.
    ///
    /// Backends without durable state keep nothing.
    async fn mark_delivered(&self, _url: &str) -> Result<(), SummaryError> {
        Ok(())
    }

    /// Urls marked delivered whose records still exist, oldest first.
    async fn list_delivered(&self) -> Result<Vec<String>, SummaryError> {
        Ok(Vec::new())
    }
}

/// The stored form of `url`: its parsed, normalized spelling when it is a
/// valid page URL, otherwise the trimmed input.
fn queue_key(url: &str) -> String {
    validate_url(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.trim().to_string())
}

/// One page of records plus the total record count.
#[derive(Debug, Clone)]
pub struct Page {
    pub count: usize,
    pub records: Vec<WebpageRecord>,
}

pub struct SummaryQueue<S> {
    store: WebpageStore,
    summarizer: S,
    ratio: Ratio,
}

impl<S: Summarize> SummaryQueue<S> {
    /// `ratio` is used by [`process_pending`](Self::process_pending).
    pub fn new(store: WebpageStore, summarizer: S, ratio: Ratio) -> Self {
        Self {
            store,
            summarizer,
            ratio,
        }
    }

    pub fn ratio(&self) -> Ratio {
        self.ratio
    }

    /// Add `url` as a pending record, or return the existing record unchanged.
    pub fn enqueue(&self, url: &str) -> Result<WebpageRecord, SummaryError> {
        let url = validate_url(url)?;
        self.store.insert_or_get(url.as_str())
    }

    /// Enqueue `url` and summarize it right away.
    ///
    /// Errors are returned to the caller. A record whose summarization fails
    /// stays pending and is picked up by the next
    /// [`process_pending`](Self::process_pending).
    #[instrument(level = "info", skip(self))]
    pub async fn submit(&self, url: &str, ratio: Ratio) -> Result<WebpageRecord, SummaryError> {
        let record = self.enqueue(url)?;
        if record.is_ready() {
            info!(id = record.id, "Page already summarized");
            return Ok(record);
        }

        let page = self.summarizer.summarize(&record.url, ratio.get()).await?;
        self.store.mark_ready(record.id, &page.title, &page.summary)?;
        self.store.get(record.id)?.ok_or_else(|| {
            SummaryError::Storage(format!("record for {} was removed during submission", record.url))
        })
    }

    /// Try once to summarize every pending record; returns how many became ready.
    ///
    /// Failures are logged per record and leave it pending. Only a storage
    /// failure while listing the backlog is returned.
    #[instrument(level = "info", skip(self))]
    pub async fn process_pending(&self) -> Result<usize, SummaryError> {
        let pending = self.store.list_by_state(RecordState::Pending)?;
        let total = pending.len();
        let mut ready = 0;

        for record in pending {
            match self.summarizer.summarize(&record.url, self.ratio.get()).await {
                Ok(page) => match self.store.mark_ready(record.id, &page.title, &page.summary) {
                    Ok(true) => ready += 1,
                    Ok(false) => warn!(url = %record.url, "Record left the pending state during processing"),
                    Err(e) => warn!(url = %record.url, error = %e, "Could not store summary; will retry"),
                },
                Err(e) => {
                    warn!(url = %record.url, error = %e, "Summarization failed; record stays pending");
                }
            }
        }

        info!(total, ready, still_pending = total - ready, "Processed pending pages");
        Ok(ready)
    }

    pub fn get(&self, id: i64) -> Result<Option<WebpageRecord>, SummaryError> {
        self.store.get(id)
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<WebpageRecord>, SummaryError> {
        self.store.get_by_url(&queue_key(url))
    }

    pub fn list_pending(&self) -> Result<Vec<WebpageRecord>, SummaryError> {
        self.store.list_by_state(RecordState::Pending)
    }

    /// Records on 1-based `page` of `page_size`, ordered by id.
    pub fn page(&self, page: usize, page_size: usize) -> Result<Page, SummaryError> {
        let page_size = page_size.max(1);
        let offset = page.saturating_sub(1) * page_size;
        Ok(Page {
            count: self.store.count()?,
            records: self.store.list_page(offset, page_size)?,
        })
    }

    /// Every record, pending and ready, ordered by id.
    pub fn list_all(&self) -> Result<Vec<WebpageRecord>, SummaryError> {
        let count = self.store.count()?;
        self.store.list_page(0, count.max(1))
    }
}

impl<S: Summarize> ReadyQueue for SummaryQueue<S> {
    async fn list_ready(&self) -> Result<Vec<WebpageRecord>, SummaryError> {
        self.store.list_undelivered_ready()
    }

    async fn delete(&self, url: &str) -> Result<(), SummaryError> {
        let removed = self.store.delete_url(&queue_key(url))?;
        info!(%url, removed, "Deleted webpage");
        Ok(())
    }

    async fn mark_delivered(&self, url: &str) -> Result<(), SummaryError> {
        self.store.mark_delivered(&queue_key(url))?;
        Ok(())
    }

    async fn list_delivered(&self) -> Result<Vec<String>, SummaryError> {
        self.store.list_delivered()
    }
}
