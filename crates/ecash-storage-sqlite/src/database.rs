//! Database connection and initialization

use crate::{migrations, Result};
use ecash_core::Fingerprint;
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time a statement waits on a locked database before SQLITE_BUSY
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `path` and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();

        let conn = Connection::open_with_flags(
            &path_buf,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.busy_timeout(busy_timeout)?;
        // WAL plus FULL sync: a committed counter survives power loss
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA synchronous=FULL;")?;

        migrations::run_migrations(&conn)?;

        tracing::debug!("Opened wallet store {}", path_buf.display());

        Ok(Self {
            conn,
            path: path_buf,
        })
    }

    /// Open the store owned by `fingerprint` inside `dir`
    pub fn open_for_identity<P: AsRef<Path>>(
        dir: P,
        fingerprint: &Fingerprint,
        busy_timeout: Duration,
    ) -> Result<Self> {
        Self::open(Self::store_path(dir, fingerprint), busy_timeout)
    }

    /// Path of the store owned by `fingerprint` inside `dir`
    pub fn store_path<P: AsRef<Path>>(dir: P, fingerprint: &Fingerprint) -> PathBuf {
        dir.as_ref().join(fingerprint.store_file_name())
    }

    /// Get connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// File backing this database
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a write transaction that takes the write lock up front.
    ///
    /// Rolls back on drop unless committed.
    pub fn write_transaction(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}
