//! Client for a summary queue served over HTTP by [`crate::api`].
//!
//! Listings are paginated; [`RemoteQueue::records`] walks `next` links lazily
//! and always starts again from the first page, so a retried listing never
//! resumes halfway through a stale cursor.

use futures::stream::{self, Stream, TryStreamExt};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::ReadyQueue;
use crate::api::{Paginated, WebpageResource, WEBPAGES_PATH};
use crate::errors::SummaryError;
use crate::models::WebpageRecord;

pub struct RemoteQueue {
    client: Client,
    base: Url,
    /// Record links by page URL, refreshed on every listing.
    links: Mutex<HashMap<String, Url>>,
}

impl RemoteQueue {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SummaryError> {
        let base = Url::parse(base_url)
            .map_err(|e| SummaryError::Config(format!("invalid remote queue URL {base_url:?}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummaryError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base,
            links: Mutex::new(HashMap::new()),
        })
    }

    fn resolve(&self, link: &str) -> Result<Url, SummaryError> {
        self.base
            .join(link)
            .map_err(|e| SummaryError::Storage(format!("bad link {link:?} from queue service: {e}")))
    }

    #[instrument(level = "debug", skip(self), fields(page = %link))]
    async fn fetch_page(&self, link: Url) -> Result<Paginated<WebpageResource>, SummaryError> {
        let response = self
            .client
            .get(link.clone())
            .send()
            .await
            .map_err(|e| SummaryError::Storage(format!("queue service unreachable: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SummaryError::Storage(format!(
                "queue service returned {status} for {link}"
            )));
        }
        let page: Paginated<WebpageResource> = response
            .json()
            .await
            .map_err(|e| SummaryError::Storage(format!("malformed queue listing: {e}")))?;
        debug!(count = page.count, results = page.results.len(), "Fetched listing page");
        Ok(page)
    }

    /// Every record in the remote queue, one page at a time.
    pub fn records(&self) -> impl Stream<Item = Result<WebpageResource, SummaryError>> + '_ {
        stream::try_unfold(Some(WEBPAGES_PATH.to_string()), move |cursor| async move {
            let Some(link) = cursor else {
                return Ok(None);
            };
            let link = self.resolve(&link)?;
            let page = self.fetch_page(link.clone()).await?;
            // A page pointing at itself would never end the walk.
            let next = page
                .next
                .filter(|n| self.resolve(n).map_or(true, |resolved| resolved != link));
            let results = stream::iter(page.results.into_iter().map(Ok::<_, SummaryError>));
            Ok::<_, SummaryError>(Some((results, next)))
        })
        .try_flatten()
    }

    async fn refresh(&self) -> Result<Vec<WebpageResource>, SummaryError> {
        let resources: Vec<WebpageResource> = self.records().try_collect().await?;
        let mut links = self.links.lock()?;
        links.clear();
        for r in &resources {
            links.insert(r.webpage_url.clone(), self.resolve(&r.url)?);
        }
        Ok(resources)
    }

    fn link_for(&self, url: &str) -> Result<Option<Url>, SummaryError> {
        Ok(self.links.lock()?.get(url).cloned())
    }
}

impl ReadyQueue for RemoteQueue {
    async fn list_ready(&self) -> Result<Vec<WebpageRecord>, SummaryError> {
        let ready: Vec<WebpageRecord> = self
            .refresh()
            .await?
            .into_iter()
            .filter(|r| !r.webpage_summary.is_empty())
            .map(WebpageRecord::from)
            .collect();
        info!(count = ready.len(), "Listed ready pages from queue service");
        Ok(ready)
    }

    #[instrument(level = "info", skip(self))]
    async fn delete(&self, url: &str) -> Result<(), SummaryError> {
        let link = match self.link_for(url)? {
            Some(link) => link,
            None => {
                self.refresh()
                    .await
                    .map_err(|e| SummaryError::deletion(url, e))?;
                match self.link_for(url)? {
                    Some(link) => link,
                    None => {
                        debug!("Page not in queue; nothing to delete");
                        return Ok(());
                    }
                }
            }
        };

        let response = self
            .client
            .delete(link)
            .send()
            .await
            .map_err(|e| SummaryError::deletion(url, e))?;
        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => {
                self.links.lock()?.remove(url);
                Ok(())
            }
            s => {
                warn!(status = %s, "Queue service refused deletion");
                Err(SummaryError::deletion(url, format!("HTTP status {s}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::spawn_api;
    use crate::test_support::serve_pages;
    use serde_json::json;

    async fn submit(api: &str, page: &str) {
        let resp = reqwest::Client::new()
            .post(format!("{api}/v1/webpages"))
            .json(&json!({ "webpage_url": page }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn test_list_ready_drains_every_page() {
        let pages = serve_pages().await;
        let api = spawn_api(1).await;
        submit(&api, &format!("{pages}/article")).await;
        submit(&api, &format!("{pages}/second")).await;

        let remote = RemoteQueue::new(&api, Duration::from_secs(5)).unwrap();
        let ready = remote.list_ready().await.unwrap();
        let urls: Vec<String> = ready.iter().map(|r| r.url.clone()).collect();
        assert_eq!(urls, vec![format!("{pages}/article"), format!("{pages}/second")]);

        // Restartable: a second listing sees the same records from the start.
        assert_eq!(remote.list_ready().await.unwrap(), ready);
    }

    #[tokio::test]
    async fn test_delete_removes_and_is_idempotent() {
        let pages = serve_pages().await;
        let api = spawn_api(10).await;
        let article = format!("{pages}/article");
        submit(&api, &article).await;

        let remote = RemoteQueue::new(&api, Duration::from_secs(5)).unwrap();
        assert_eq!(remote.list_ready().await.unwrap().len(), 1);
        remote.delete(&article).await.unwrap();
        remote.delete(&article).await.unwrap();
        remote.delete("http://example.com/never-submitted").await.unwrap();
        assert!(remote.list_ready().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_storage_error() {
        let remote = RemoteQueue::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = remote.list_ready().await.unwrap_err();
        assert!(matches!(err, SummaryError::Storage(_)), "{err}");
    }
}
