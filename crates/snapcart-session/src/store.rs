use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use snapcart_core::Cookie;

use crate::error::Result;

/// A session as read back from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub cookies: Vec<Cookie>,
    pub expires_at: DateTime<Utc>,
}

impl CachedSession {
    /// Valid iff `now` is strictly before the expiry.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Single-row persistent store for the session cookie blob and its expiry.
///
/// Wraps one SQLite connection in a `Mutex`; the scheduler is a single
/// logical thread so there is no contention to speak of.
pub struct SessionStore {
    db: Mutex<Connection>,
}

impl SessionStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Read the cached session, if any.
    ///
    /// Any failure — missing row, unreadable JSON, bad timestamp — returns
    /// `None`: corruption forces re-acquisition, it never crashes the run.
    pub fn load(&self) -> Option<CachedSession> {
        let db = self.db.lock().unwrap();
        let (cookies_json, expires_str): (String, String) = match db.query_row(
            "SELECT cookies, expires_at FROM session_cache WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ) {
            Ok(pair) => pair,
            Err(rusqlite::Error::QueryReturnedNoRows) => return None,
            Err(e) => {
                debug!("session cache unreadable: {e}");
                return None;
            }
        };

        let cookies: Vec<Cookie> = match serde_json::from_str(&cookies_json) {
            Ok(c) => c,
            Err(e) => {
                debug!("session cache cookie blob corrupt: {e}");
                return None;
            }
        };
        let expires_at = match DateTime::parse_from_rfc3339(&expires_str) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                debug!("session cache expiry corrupt: {e}");
                return None;
            }
        };

        Some(CachedSession {
            cookies,
            expires_at,
        })
    }

    /// Persist the cookie set together with its expiry (single upsert — the
    /// two are never written independently).
    pub fn save(&self, cookies: &[Cookie], expires_at: DateTime<Utc>) -> Result<()> {
        let blob = serde_json::to_string(cookies)?;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR REPLACE INTO session_cache (id, cookies, expires_at)
             VALUES (1, ?1, ?2)",
            rusqlite::params![blob, expires_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Extend the expiry window of the stored session.
    ///
    /// No-op when nothing is cached — the expiry must never exist without
    /// its token.
    pub fn touch(&self, expires_at: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE session_cache SET expires_at = ?1 WHERE id = 1",
            rusqlite::params![expires_at.to_rfc3339()],
        )?;
        Ok(())
    }
}
