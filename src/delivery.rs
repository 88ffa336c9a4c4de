//! Reading ready summaries aloud and deleting them once read.
//!
//! The [`DeliveryDriver`] walks the ready records of a [`ReadyQueue`] in
//! insertion order. A record is deleted only after its title and every
//! sentence of its summary were spoken. Spoken urls are marked delivered in
//! the queue and wait in a pending-delete list until the queue confirms their
//! deletion; a url whose deletion fails stays listed, is retried on the next
//! flush, and is never spoken again. Queues that persist the delivered mark
//! hand those urls back to a fresh driver, so a restart does not re-read them.
//!
//! Stop requests are honored between records only, and every way out of a
//! delivery pass (exhaustion, stop, speech failure) runs the flush.

use tracing::{debug, info, instrument, warn};

use crate::errors::SummaryError;
use crate::models::WebpageRecord;
use crate::queue::ReadyQueue;
use crate::summarizer::textrank::split_sentences;

/// Speech output. `speak` returns once the text has been fully spoken.
pub trait Speaker {
    async fn speak(&mut self, text: &str) -> Result<(), SummaryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Stop,
}

/// Asked after every delivered record whether to keep going.
pub trait ContinuePrompt {
    /// `remaining` is the number of ready records not yet read in this pass.
    async fn confirm_continue(&mut self, remaining: usize) -> Continuation;
}

/// Outcome of one delivery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Records read in full.
    pub spoken: usize,
    /// Deletions confirmed during the pass, including retried ones.
    pub deleted: usize,
    /// Spoken urls whose deletion is still outstanding.
    pub awaiting_deletion: usize,
    /// Whether the listener asked to stop before the queue was exhausted.
    pub stopped: bool,
}

pub struct DeliveryDriver<Q> {
    queue: Q,
    pending_delete: Vec<String>,
}

impl<Q: ReadyQueue> DeliveryDriver<Q> {
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            pending_delete: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Spoken urls not yet confirmed deleted, in delivery order.
    pub fn pending_deletions(&self) -> &[String] {
        &self.pending_delete
    }

    /// Read every ready record once, deleting each after it is spoken.
    ///
    /// Speaks nothing when there is nothing to read; the report then has
    /// `spoken == 0`.
    ///
    /// Returns the speech error, if any, after the deletion flush has run.
    /// A storage failure while listing ready records is returned before
    /// anything is spoken.
    #[instrument(level = "info", skip_all)]
    pub async fn deliver_all<S, P>(
        &mut self,
        speaker: &mut S,
        prompt: &mut P,
    ) -> Result<DeliveryReport, SummaryError>
    where
        S: Speaker,
        P: ContinuePrompt,
    {
        let mut report = DeliveryReport {
            deleted: self.flush().await,
            ..Default::default()
        };

        let ready: Vec<WebpageRecord> = self
            .queue
            .list_ready()
            .await?
            .into_iter()
            .filter(|r| {
                let skip = self.pending_delete.contains(&r.url);
                if skip {
                    debug!(url = %r.url, "Already read; waiting for deletion");
                }
                !skip
            })
            .collect();

        let outcome = self.read_records(&ready, speaker, prompt, &mut report).await;

        report.deleted += self.flush().await;
        report.awaiting_deletion = self.pending_delete.len();
        info!(
            spoken = report.spoken,
            deleted = report.deleted,
            awaiting_deletion = report.awaiting_deletion,
            stopped = report.stopped,
            "Delivery pass finished"
        );
        outcome.map(|_| report)
    }

    async fn read_records<S, P>(
        &mut self,
        ready: &[WebpageRecord],
        speaker: &mut S,
        prompt: &mut P,
        report: &mut DeliveryReport,
    ) -> Result<(), SummaryError>
    where
        S: Speaker,
        P: ContinuePrompt,
    {
        for (i, record) in ready.iter().enumerate() {
            if let Err(e) = speak_record(speaker, record).await {
                warn!(url = %record.url, error = %e, "Speech failed; abandoning delivery pass");
                return Err(e);
            }
            report.spoken += 1;
            if let Err(e) = self.queue.mark_delivered(&record.url).await {
                warn!(url = %record.url, error = %e, "Could not record delivery");
            }
            self.pending_delete.push(record.url.clone());
            if self.try_delete(&record.url).await {
                report.deleted += 1;
            }

            let remaining = ready.len() - i - 1;
            if prompt.confirm_continue(remaining).await == Continuation::Stop {
                info!(remaining, "Listener stopped delivery");
                report.stopped = true;
                break;
            }
        }
        Ok(())
    }

    /// External stop signal: retry every outstanding deletion.
    ///
    /// Returns the number of deletions confirmed.
    pub async fn stop(&mut self) -> usize {
        self.flush().await
    }

    /// Retry every outstanding deletion, including urls an earlier driver
    /// marked delivered but could not delete.
    async fn flush(&mut self) -> usize {
        match self.queue.list_delivered().await {
            Ok(urls) => {
                for url in urls {
                    if !self.pending_delete.contains(&url) {
                        debug!(%url, "Resuming deletion of a delivered page");
                        self.pending_delete.push(url);
                    }
                }
            }
            Err(e) => warn!(error = %e, "Could not list delivered pages"),
        }

        let mut deleted = 0;
        for url in self.pending_delete.clone() {
            if self.try_delete(&url).await {
                deleted += 1;
            }
        }
        deleted
    }

    /// Delete `url` from the queue, dropping it from the pending list on success.
    async fn try_delete(&mut self, url: &str) -> bool {
        match self.queue.delete(url).await {
            Ok(()) => {
                self.pending_delete.retain(|u| u != url);
                debug!(%url, "Deleted delivered page");
                true
            }
            Err(e) => {
                warn!(%url, error = %e, "Deletion failed; will retry on next flush");
                false
            }
        }
    }
}

async fn speak_record<S: Speaker>(speaker: &mut S, record: &WebpageRecord) -> Result<(), SummaryError> {
    if !record.title.is_empty() {
        speaker.speak(&record.title).await?;
    }
    for sentence in split_sentences(&record.summary) {
        speaker.speak(&sentence).await?;
    }
    Ok(())
}
