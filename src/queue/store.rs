//! SQLite storage for webpage records.
//!
//! [`WebpageStore`] owns the connection and is the only code that writes the
//! `webpages` table. The connection sits behind a mutex so the store can be
//! shared with the HTTP API; no lock is ever held across an `.await`.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::migrations;
use crate::errors::SummaryError;
use crate::models::{RecordState, WebpageRecord};

const COLUMNS: &str = "id, url, title, summary, state, created_at, ready_at";

pub struct WebpageStore {
    conn: Mutex<Connection>,
}

impl WebpageStore {
    /// Opens (or creates) the database at `path` and runs migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SummaryError> {
        let conn = Connection::open(path)?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, discarded on drop.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, SummaryError> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SummaryError> {
        Ok(self.conn.lock()?)
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<WebpageRecord> {
        let state: String = row.get(4)?;
        let state = RecordState::parse(&state).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown record state {state:?}").into(),
            )
        })?;
        Ok(WebpageRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            summary: row.get(3)?,
            state,
            created_at: row.get(5)?,
            ready_at: row.get(6)?,
        })
    }

    /// Inserts a pending record for `url` unless one exists; returns the stored record.
    pub fn insert_or_get(&self, url: &str) -> Result<WebpageRecord, SummaryError> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO webpages (url, state, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO NOTHING",
            params![url, RecordState::Pending.as_str(), Utc::now()],
        )?;
        debug!(%url, inserted = inserted > 0, "Upserted webpage");
        let record = conn.query_row(
            &format!("SELECT {COLUMNS} FROM webpages WHERE url = ?1"),
            params![url],
            Self::row_to_record,
        )?;
        Ok(record)
    }

    /// Moves a pending record to ready. Returns `false` if the record is gone
    /// or was already ready, in which case nothing changes.
    pub fn mark_ready(&self, id: i64, title: &str, summary: &str) -> Result<bool, SummaryError> {
        let changed = self.conn()?.execute(
            "UPDATE webpages SET title = ?1, summary = ?2, state = ?3, ready_at = ?4
             WHERE id = ?5 AND state = ?6",
            params![
                title,
                summary,
                RecordState::Ready.as_str(),
                Utc::now(),
                id,
                RecordState::Pending.as_str()
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn get(&self, id: i64) -> Result<Option<WebpageRecord>, SummaryError> {
        let record = self
            .conn()?
            .query_row(
                &format!("SELECT {COLUMNS} FROM webpages WHERE id = ?1"),
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<WebpageRecord>, SummaryError> {
        let record = self
            .conn()?
            .query_row(
                &format!("SELECT {COLUMNS} FROM webpages WHERE url = ?1"),
                params![url],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Records in `state`, oldest first.
    pub fn list_by_state(&self, state: RecordState) -> Result<Vec<WebpageRecord>, SummaryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM webpages WHERE state = ?1 ORDER BY id"
        ))?;
        let records = stmt
            .query_map(params![state.as_str()], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Ready records not yet marked delivered, oldest first.
    pub fn list_undelivered_ready(&self) -> Result<Vec<WebpageRecord>, SummaryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM webpages
             WHERE state = ?1 AND delivered_at IS NULL ORDER BY id"
        ))?;
        let records = stmt
            .query_map(params![RecordState::Ready.as_str()], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Marks the record for `url` as read in full. Returns `false` if it is
    /// gone or was already marked.
    pub fn mark_delivered(&self, url: &str) -> Result<bool, SummaryError> {
        let changed = self.conn()?.execute(
            "UPDATE webpages SET delivered_at = ?1 WHERE url = ?2 AND delivered_at IS NULL",
            params![Utc::now(), url],
        )?;
        Ok(changed > 0)
    }

    /// Urls of delivered records still awaiting deletion, oldest first.
    pub fn list_delivered(&self) -> Result<Vec<String>, SummaryError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT url FROM webpages WHERE delivered_at IS NOT NULL ORDER BY id")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    /// A window of all records ordered by id.
    pub fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<WebpageRecord>, SummaryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM webpages ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;
        let records = stmt
            .query_map(params![limit as i64, offset as i64], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<usize, SummaryError> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM webpages", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Removes the record for `url`. Returns whether a row was deleted.
    pub fn delete_url(&self, url: &str) -> Result<bool, SummaryError> {
        let conn = self.conn().map_err(|e| SummaryError::deletion(url, e))?;
        let deleted = conn
            .execute("DELETE FROM webpages WHERE url = ?1", params![url])
            .map_err(|e| SummaryError::deletion(url, e))?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_or_get_is_idempotent() {
        let store = WebpageStore::open_in_memory().unwrap();
        let first = store.insert_or_get("https://example.com/a").unwrap();
        let second = store.insert_or_get("https://example.com/a").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(first.state, RecordState::Pending);
        assert!(first.title.is_empty() && first.summary.is_empty());
        assert!(first.ready_at.is_none());
    }

    #[test]
    fn test_mark_ready_only_once() {
        let store = WebpageStore::open_in_memory().unwrap();
        let rec = store.insert_or_get("https://example.com/a").unwrap();
        assert!(store.mark_ready(rec.id, "Title", "Summary.").unwrap());
        assert!(!store.mark_ready(rec.id, "Other", "Other.").unwrap());

        let rec = store.get(rec.id).unwrap().unwrap();
        assert_eq!(rec.state, RecordState::Ready);
        assert_eq!(rec.title, "Title");
        assert!(rec.ready_at.is_some());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let store = WebpageStore::open_in_memory().unwrap();
        let a = store.insert_or_get("https://example.com/a").unwrap();
        assert!(store.delete_url("https://example.com/a").unwrap());
        let b = store.insert_or_get("https://example.com/b").unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_list_page_windows() {
        let store = WebpageStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.insert_or_get(&format!("https://example.com/{i}")).unwrap();
        }
        let page = store.list_page(2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].url, "https://example.com/2");
        assert!(store.list_page(10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.sqlite3");
        {
            let store = WebpageStore::open(&path).unwrap();
            let rec = store.insert_or_get("https://example.com/a").unwrap();
            store.mark_ready(rec.id, "A", "Summary of a.").unwrap();
        }
        let store = WebpageStore::open(&path).unwrap();
        let ready = store.list_by_state(RecordState::Ready).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].summary, "Summary of a.");
    }

    #[test]
    fn test_delivered_records_leave_the_ready_list() {
        let store = WebpageStore::open_in_memory().unwrap();
        for url in ["https://example.com/a", "https://example.com/b"] {
            let rec = store.insert_or_get(url).unwrap();
            store.mark_ready(rec.id, "T", "S.").unwrap();
        }
        assert!(store.mark_delivered("https://example.com/a").unwrap());
        assert!(!store.mark_delivered("https://example.com/a").unwrap());
        assert!(!store.mark_delivered("https://example.com/never").unwrap());

        let ready = store.list_undelivered_ready().unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].url, "https://example.com/b");
        assert_eq!(store.list_delivered().unwrap(), ["https://example.com/a"]);

        assert!(store.delete_url("https://example.com/a").unwrap());
        assert!(store.list_delivered().unwrap().is_empty());
    }
}
