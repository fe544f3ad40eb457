//! Event store contract and SQLite implementation.
//!
//! # Responsibility
//! - Append immutable, timestamped events scoped to a garment.
//! - Query a garment's events by kind and inclusive time range.
//!
//! # Invariants
//! - Query results are ascending by `occurred_at`, ties in insertion order.
//! - Appending or querying for an unknown garment fails with `NotFound`.
//! - Backing-store reachability failures surface as `Unavailable`; the store
//!   never retries on its own.

use crate::db::DbError;
use crate::model::event::{EventFilter, EventKind, GarmentEvent};
use crate::model::garment::GarmentId;
use crate::repo::schema::{first_missing_table, garment_exists};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{ffi, params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT
    garment_id,
    kind,
    occurred_at
FROM garment_events";

const REQUIRED_TABLES: &[&str] = &["garments", "garment_events"];

pub type StoreResult<T> = Result<T, StoreError>;

/// Event store failure.
#[derive(Debug)]
pub enum StoreError {
    /// Backing store could not be reached (busy, locked, I/O).
    Unavailable(DbError),
    /// In-process store lock was poisoned by a panicking writer.
    LockPoisoned,
    /// Referenced garment does not exist.
    NotFound(GarmentId),
    /// Connection is missing a table the store relies on.
    MissingRequiredTable(&'static str),
    /// Persisted row could not be decoded.
    InvalidData(String),
    /// Any other database failure.
    Db(DbError),
}

impl StoreError {
    /// Whether the caller may reasonably retry later.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::LockPoisoned)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "event store unavailable: {err}"),
            Self::LockPoisoned => write!(f, "event store unavailable: lock poisoned"),
            Self::NotFound(id) => write!(f, "garment not found: {id}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "event store missing required table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted event data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) | Self::Db(err) => Some(err),
            Self::LockPoisoned
            | Self::NotFound(_)
            | Self::MissingRequiredTable(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        if value.is_unavailable() {
            Self::Unavailable(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}

/// Durable, queryable storage of ledger events.
pub trait EventStore {
    /// Appends one event to its garment's log.
    fn append(&self, event: &GarmentEvent) -> StoreResult<()>;

    /// Returns matching events of one garment in log order.
    fn query(&self, garment_id: GarmentId, filter: &EventFilter) -> StoreResult<Vec<GarmentEvent>>;

    /// Appends `event` only when `filter` matches none of its garment's
    /// events. Returns whether the event was written.
    ///
    /// The default is check-then-append: two concurrent callers can both
    /// pass the check. Stores with transactional primitives override this.
    fn append_if_absent(&self, event: &GarmentEvent, filter: &EventFilter) -> StoreResult<bool> {
        if !self.query(event.garment_id, filter)?.is_empty() {
            return Ok(false);
        }
        self.append(event)?;
        Ok(true)
    }
}

impl<S: EventStore + ?Sized> EventStore for &S {
    fn append(&self, event: &GarmentEvent) -> StoreResult<()> {
        (**self).append(event)
    }

    fn query(&self, garment_id: GarmentId, filter: &EventFilter) -> StoreResult<Vec<GarmentEvent>> {
        (**self).query(garment_id, filter)
    }

    fn append_if_absent(&self, event: &GarmentEvent, filter: &EventFilter) -> StoreResult<bool> {
        (**self).append_if_absent(event, filter)
    }
}

/// SQLite-backed event store.
pub struct SqliteEventStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        if let Some(table) = first_missing_table(conn, REQUIRED_TABLES)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        Ok(Self { conn })
    }

    fn ensure_garment_exists(&self, garment_id: GarmentId) -> StoreResult<()> {
        if garment_exists(self.conn, &garment_id.to_string())? {
            Ok(())
        } else {
            Err(StoreError::NotFound(garment_id))
        }
    }
}

impl EventStore for SqliteEventStore<'_> {
    fn append(&self, event: &GarmentEvent) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO garment_events (garment_id, kind, occurred_at)
                 VALUES (?1, ?2, ?3);",
                params![
                    event.garment_id.to_string(),
                    event.kind.as_str(),
                    event.occurred_at.timestamp_millis(),
                ],
            )
            .map_err(|err| map_write_error(err, event.garment_id))?;
        Ok(())
    }

    fn query(&self, garment_id: GarmentId, filter: &EventFilter) -> StoreResult<Vec<GarmentEvent>> {
        self.ensure_garment_exists(garment_id)?;

        let mut sql = format!("{EVENT_SELECT_SQL} WHERE garment_id = ?");
        let mut bind_values = vec![Value::Text(garment_id.to_string())];

        if let Some(kind) = filter.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND occurred_at >= ?");
            bind_values.push(Value::Integer(from.timestamp_millis()));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND occurred_at <= ?");
            bind_values.push(Value::Integer(to.timestamp_millis()));
        }
        sql.push_str(" ORDER BY occurred_at ASC, seq ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    // Single statement, so SQLite's write lock covers both check and insert.
    fn append_if_absent(&self, event: &GarmentEvent, filter: &EventFilter) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT INTO garment_events (garment_id, kind, occurred_at)
                 SELECT ?1, ?2, ?3
                 WHERE NOT EXISTS (
                    SELECT 1
                    FROM garment_events
                    WHERE garment_id = ?1
                      AND (?4 IS NULL OR kind = ?4)
                      AND (?5 IS NULL OR occurred_at >= ?5)
                      AND (?6 IS NULL OR occurred_at <= ?6)
                 );",
                params![
                    event.garment_id.to_string(),
                    event.kind.as_str(),
                    event.occurred_at.timestamp_millis(),
                    filter.kind.map(EventKind::as_str),
                    filter.from.map(|from| from.timestamp_millis()),
                    filter.to.map(|to| to.timestamp_millis()),
                ],
            )
            .map_err(|err| map_write_error(err, event.garment_id))?;
        Ok(changed == 1)
    }
}

fn map_write_error(err: rusqlite::Error, garment_id: GarmentId) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            StoreError::NotFound(garment_id)
        }
        _ => err.into(),
    }
}

fn parse_event_row(row: &Row<'_>) -> StoreResult<GarmentEvent> {
    let garment_text: String = row.get("garment_id")?;
    let garment_id = Uuid::parse_str(&garment_text).map_err(|_| {
        StoreError::InvalidData(format!(
            "invalid uuid value `{garment_text}` in garment_events.garment_id"
        ))
    })?;

    let kind_text: String = row.get("kind")?;
    let kind = EventKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid event kind `{kind_text}` in garment_events.kind"
        ))
    })?;

    let occurred_ms: i64 = row.get("occurred_at")?;
    let occurred_at = DateTime::<Utc>::from_timestamp_millis(occurred_ms).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "out-of-range timestamp `{occurred_ms}` in garment_events.occurred_at"
        ))
    })?;

    Ok(GarmentEvent {
        garment_id,
        kind,
        occurred_at,
    })
}
