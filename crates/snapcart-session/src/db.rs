use rusqlite::Connection;

use crate::error::Result;

/// Initialise the session-cache schema in `conn`.
///
/// Safe to call on every startup — uses `IF NOT EXISTS`. The CHECK pins the
/// table to one row: there is exactly one cached session per cache file.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS session_cache (
            id          INTEGER NOT NULL PRIMARY KEY CHECK (id = 1),
            cookies     TEXT    NOT NULL,   -- JSON-encoded cookie list
            expires_at  TEXT    NOT NULL    -- RFC 3339 UTC
        ) STRICT;",
    )?;
    Ok(())
}
