//! Client table access backed by SQLite.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use clientsync_types::{
    timestamp, ClientId, ClientRecord, ClientStatus, ClientUpdate, NewClient, TransformedRecord,
};
use rusqlite::{params, Connection, ErrorCode, InterruptHandle, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS clients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        first_name TEXT NOT NULL,
        email TEXT NOT NULL COLLATE NOCASE UNIQUE,
        phone TEXT,
        address TEXT,
        city TEXT,
        postal_code TEXT,
        country TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        synced_at TEXT,
        deleted_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_clients_watermark ON clients (synced_at, updated_at);
";

const COLUMNS: &str = "id, name, first_name, email, phone, address, city, postal_code, country, \
                       status, created_at, updated_at, synced_at";

/// How long a statement waits for another connection's lock by default.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Typed gateway to one relational store.
///
/// Cloning is cheap and yields a handle to the same connection.
#[derive(Clone)]
pub struct ClientStore {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
}

impl ClientStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StoreError::Unavailable(format!("failed to open {}: {e}", path.display()))
        })?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Self::with_connection(conn)
    }

    /// Opens a store that must already exist. A missing file is
    /// `Unavailable` instead of a fresh empty database.
    pub fn open_existing(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            StoreError::Unavailable(format!("failed to open {}: {e}", path.display()))
        })?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(format!("failed to open in-memory store: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Unavailable(format!("failed to init schema: {e}")))?;
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        })
    }

    /// Bounds how long any statement waits on a lock held by another
    /// connection. Applies to every clone of this store.
    pub fn set_busy_timeout(&self, timeout: Duration) -> StoreResult<()> {
        self.conn()?.busy_timeout(timeout)?;
        Ok(())
    }

    /// Aborts the statement currently running on this connection, if any.
    /// The aborted call fails with an interrupt error and commits nothing.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    // ── Pipeline operations ──────────────────────────────────────

    /// Returns every live row whose watermark is missing or older than its
    /// last modification, ordered by id.
    pub fn fetch_sync_candidates(&self) -> StoreResult<Vec<ClientRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM clients
             WHERE deleted_at IS NULL AND (synced_at IS NULL OR synced_at < updated_at)
             ORDER BY id"
        ))?;
        let rows = stmt.query_map([], RawClientRow::from_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_record()?);
        }
        debug!(count = result.len(), "fetched sync candidates");
        Ok(result)
    }

    /// Inserts or updates the row matching the record's lower-cased email.
    ///
    /// All mutable fields are overwritten. `updated_at` is set to the
    /// record's `synced_at` (the reference time of the run that produced
    /// it), not to the wall clock at load time: the sink row then depends
    /// only on the record, so applying the same record again leaves the row
    /// unchanged. Every record of one run carries the same load time.
    pub fn upsert_sink_record(&self, record: &TransformedRecord) -> StoreResult<()> {
        let email = record.email.trim().to_lowercase();
        let loaded_at = timestamp::format(&record.synced_at);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO clients (name, first_name, email, phone, address, city, postal_code,
                                  country, status, created_at, updated_at, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             ON CONFLICT(email) DO UPDATE SET
                name = excluded.name,
                first_name = excluded.first_name,
                email = excluded.email,
                phone = excluded.phone,
                address = excluded.address,
                city = excluded.city,
                postal_code = excluded.postal_code,
                country = excluded.country,
                status = excluded.status,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                synced_at = excluded.synced_at,
                deleted_at = NULL",
            params![
                record.name,
                record.first_name,
                email,
                record.phone,
                record.address,
                record.city,
                record.postal_code,
                record.country,
                record.status.as_str(),
                timestamp::format(&record.created_at),
                loaded_at,
            ],
        )?;
        Ok(())
    }

    /// Sets the watermark of a live row.
    ///
    /// Returns `false` (and logs) when the row is gone or soft-deleted; that
    /// is not an error because rows may disappear while a run is in flight.
    pub fn mark_synced(&self, id: ClientId, at: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE clients SET synced_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id.get(), timestamp::format(&at)],
        )?;
        if changed == 0 {
            warn!(client_id = %id, "cannot mark client synced: row no longer exists");
            return Ok(false);
        }
        Ok(true)
    }

    // ── Primary-store writes ─────────────────────────────────────

    /// Creates a client and returns the stored row.
    pub fn insert_client(&self, client: &NewClient) -> StoreResult<ClientRecord> {
        let now = timestamp::format(&timestamp::now());
        let email = client.email.trim().to_string();
        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO clients (name, first_name, email, phone, address, city, postal_code,
                                      country, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    client.name,
                    client.first_name,
                    email,
                    client.phone,
                    client.address,
                    client.city,
                    client.postal_code,
                    client.country,
                    client.status.as_str(),
                    now,
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    StoreError::Duplicate(email.clone())
                }
                other => StoreError::Database(other),
            })?;
            conn.last_insert_rowid()
        };
        self.get_client(ClientId::new(id))?
            .ok_or_else(|| StoreError::InvalidData(format!("inserted client {id} not found")))
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Returns `None` if the row does not exist or is soft-deleted.
    pub fn update_client(
        &self,
        id: ClientId,
        update: &ClientUpdate,
    ) -> StoreResult<Option<ClientRecord>> {
        let Some(mut current) = self.get_client(id)? else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            current.name = name.clone();
        }
        if let Some(first_name) = &update.first_name {
            current.first_name = first_name.clone();
        }
        if let Some(email) = &update.email {
            current.email = email.trim().to_string();
        }
        if update.phone.is_some() {
            current.phone = update.phone.clone();
        }
        if update.address.is_some() {
            current.address = update.address.clone();
        }
        if update.city.is_some() {
            current.city = update.city.clone();
        }
        if update.postal_code.is_some() {
            current.postal_code = update.postal_code.clone();
        }
        if update.country.is_some() {
            current.country = update.country.clone();
        }
        if let Some(status) = update.status {
            current.status = status;
        }
        current.updated_at = timestamp::now();

        let conn = self.conn()?;
        conn.execute(
            "UPDATE clients SET name = ?2, first_name = ?3, email = ?4, phone = ?5, address = ?6,
                    city = ?7, postal_code = ?8, country = ?9, status = ?10, updated_at = ?11
             WHERE id = ?1 AND deleted_at IS NULL",
            params![
                id.get(),
                current.name,
                current.first_name,
                current.email,
                current.phone,
                current.address,
                current.city,
                current.postal_code,
                current.country,
                current.status.as_str(),
                timestamp::format(&current.updated_at),
            ],
        )?;
        Ok(Some(current))
    }

    /// Soft-deletes a client. Returns `false` if it was already gone.
    pub fn soft_delete(&self, id: ClientId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE clients SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id.get(), timestamp::format(&timestamp::now())],
        )?;
        Ok(changed > 0)
    }

    // ── Lookups ──────────────────────────────────────────────────

    /// Loads a live client by id.
    pub fn get_client(&self, id: ClientId) -> StoreResult<Option<ClientRecord>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM clients WHERE id = ?1 AND deleted_at IS NULL"),
                params![id.get()],
                RawClientRow::from_row,
            )
            .optional()?;
        raw.map(RawClientRow::into_record).transpose()
    }

    /// Loads a live client by email, ignoring case.
    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<ClientRecord>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM clients WHERE email = ?1 COLLATE NOCASE AND deleted_at IS NULL"
                ),
                params![email.trim()],
                RawClientRow::from_row,
            )
            .optional()?;
        raw.map(RawClientRow::into_record).transpose()
    }

    /// Returns the number of live clients.
    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM clients WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Column values as SQLite hands them back, before typed decoding.
struct RawClientRow {
    id: i64,
    name: String,
    first_name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
    synced_at: Option<String>,
}

impl RawClientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            first_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            address: row.get(5)?,
            city: row.get(6)?,
            postal_code: row.get(7)?,
            country: row.get(8)?,
            status: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
            synced_at: row.get(12)?,
        })
    }

    fn into_record(self) -> StoreResult<ClientRecord> {
        let id = self.id;
        let invalid = move |e: clientsync_types::Error| {
            StoreError::InvalidData(format!("client {id}: {e}"))
        };
        let status: ClientStatus = self.status.parse().map_err(invalid)?;
        let created_at = timestamp::parse(&self.created_at).map_err(invalid)?;
        let updated_at = timestamp::parse(&self.updated_at).map_err(invalid)?;
        let synced_at = self
            .synced_at
            .as_deref()
            .map(timestamp::parse)
            .transpose()
            .map_err(invalid)?;

        Ok(ClientRecord {
            id: ClientId::new(id),
            name: self.name,
            first_name: self.first_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            country: self.country,
            status,
            created_at,
            updated_at,
            synced_at,
        })
    }
}
