//! Garment registry contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist garments created by their owners.
//! - List an owner's garments in stable creation order.
//!
//! # Invariants
//! - Write and read paths call `Garment::validate()`.
//! - Garments are never updated or deleted here.

use crate::db::DbError;
use crate::model::garment::{Garment, GarmentId, GarmentValidationError};
use crate::model::identity::UserId;
use crate::repo::schema::first_missing_table;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const GARMENT_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    name,
    image_ref,
    size,
    created_at
FROM garments";

pub type RepoResult<T> = Result<T, RepoError>;

/// Garment registry failure.
#[derive(Debug)]
pub enum RepoError {
    Validation(GarmentValidationError),
    /// Backing store could not be reached (busy, locked, I/O).
    Unavailable(DbError),
    Db(DbError),
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Unavailable(err) => write!(f, "garment registry unavailable: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "garment registry missing required table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted garment data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Unavailable(err) | Self::Db(err) => Some(err),
            Self::MissingRequiredTable(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<GarmentValidationError> for RepoError {
    fn from(value: GarmentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_unavailable() {
            Self::Unavailable(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}

/// Repository interface for the garment registry.
pub trait GarmentRepository {
    fn create_garment(&self, garment: &Garment) -> RepoResult<GarmentId>;
    fn get_garment(&self, id: GarmentId) -> RepoResult<Option<Garment>>;
    /// Lists garments ordered by `created_at ASC, id ASC`.
    fn list_garments_for_owner(&self, owner_id: &UserId) -> RepoResult<Vec<Garment>>;
}

/// SQLite-backed garment registry.
pub struct SqliteGarmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGarmentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if let Some(table) = first_missing_table(conn, &["garments"])? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        Ok(Self { conn })
    }
}

impl GarmentRepository for SqliteGarmentRepository<'_> {
    fn create_garment(&self, garment: &Garment) -> RepoResult<GarmentId> {
        garment.validate()?;

        self.conn.execute(
            "INSERT INTO garments (
                id,
                owner_id,
                name,
                image_ref,
                size,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                garment.id.to_string(),
                garment.owner_id.as_str(),
                garment.name.as_str(),
                garment.image_ref.as_str(),
                garment.size.as_deref(),
                garment.created_at.timestamp_millis(),
            ],
        )?;

        Ok(garment.id)
    }

    fn get_garment(&self, id: GarmentId) -> RepoResult<Option<Garment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GARMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_garment_row(row)?));
        }
        Ok(None)
    }

    fn list_garments_for_owner(&self, owner_id: &UserId) -> RepoResult<Vec<Garment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GARMENT_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([owner_id.as_str()])?;
        let mut garments = Vec::new();
        while let Some(row) = rows.next()? {
            garments.push(parse_garment_row(row)?);
        }
        Ok(garments)
    }
}

fn parse_garment_row(row: &Row<'_>) -> RepoResult<Garment> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in garments.id"))
    })?;

    let owner_text: String = row.get("owner_id")?;
    let owner_id = UserId::new(owner_text).ok_or_else(|| {
        RepoError::InvalidData(format!("blank owner_id for garment {id}"))
    })?;

    let created_ms: i64 = row.get("created_at")?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_ms).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "out-of-range timestamp `{created_ms}` in garments.created_at"
        ))
    })?;

    let garment = Garment {
        id,
        owner_id,
        name: row.get("name")?,
        image_ref: row.get("image_ref")?,
        size: row.get("size")?,
        created_at,
    };
    garment.validate()?;
    Ok(garment)
}
