//! Business Storage
//! Mission: Persist businesses in the same SQLite database as users

use crate::business::models::Business;
use crate::db::{SharedConnection, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

#[async_trait]
pub trait BusinessRepository: Send + Sync {
    async fn create(&self, business: &Business) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Business>, StoreError>;
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, StoreError>;
    async fn list(&self) -> Result<Vec<Business>, StoreError>;
    /// `NotFound` when no row has `business.id`
    async fn update(&self, business: &Business) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

const BUSINESS_COLUMNS: &str =
    "id, owner_id, name, description, address, phone, email, is_active, created_at, updated_at";

pub struct SqliteBusinessStore {
    conn: SharedConnection,
}

impl SqliteBusinessStore {
    pub fn new(conn: SharedConnection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS businesses (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                address TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_businesses_owner ON businesses(owner_id)",
            [],
        )?;
        Ok(())
    }

    fn row_to_business(row: &Row<'_>) -> rusqlite::Result<RawBusiness> {
        Ok(RawBusiness {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            address: row.get(4)?,
            phone: row.get(5)?,
            email: row.get(6)?,
            is_active: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn query_many(&self, sql: &str, key: Option<&str>) -> Result<Vec<Business>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let raws = match key {
            Some(key) => stmt
                .query_map(params![key], Self::row_to_business)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::row_to_business)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        raws.into_iter().map(RawBusiness::into_business).collect()
    }
}

struct RawBusiness {
    id: String,
    owner_id: String,
    name: String,
    description: String,
    address: String,
    phone: String,
    email: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl RawBusiness {
    fn into_business(self) -> Result<Business, StoreError> {
        Ok(Business {
            id: parse_uuid(&self.id)?,
            owner_id: parse_uuid(&self.owner_id)?,
            name: self.name,
            description: self.description,
            address: self.address,
            phone: self.phone,
            email: self.email,
            is_active: self.is_active,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("business id {raw:?}: {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

#[async_trait]
impl BusinessRepository for SqliteBusinessStore {
    async fn create(&self, business: &Business) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO businesses (id, owner_id, name, description, address, phone, email, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                business.id.to_string(),
                business.owner_id.to_string(),
                business.name,
                business.description,
                business.address,
                business.phone,
                business.email,
                business.is_active,
                business.created_at.to_rfc3339(),
                business.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Business>, StoreError> {
        let raw = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = ?1"),
                params![id.to_string()],
                Self::row_to_business,
            )
            .optional()?
        };
        raw.map(RawBusiness::into_business).transpose()
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, StoreError> {
        self.query_many(
            &format!(
                "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE owner_id = ?1 ORDER BY created_at"
            ),
            Some(&owner_id.to_string()),
        )
    }

    async fn list(&self) -> Result<Vec<Business>, StoreError> {
        self.query_many(
            &format!("SELECT {BUSINESS_COLUMNS} FROM businesses ORDER BY created_at"),
            None,
        )
    }

    async fn update(&self, business: &Business) -> Result<(), StoreError> {
        let rows_affected = self.conn.lock().execute(
            "UPDATE businesses
             SET name = ?2, description = ?3, address = ?4, phone = ?5, email = ?6, is_active = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                business.id.to_string(),
                business.name,
                business.description,
                business.address,
                business.phone,
                business.email,
                business.is_active,
                business.updated_at.to_rfc3339(),
            ],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let rows_affected = self
            .conn
            .lock()
            .execute("DELETE FROM businesses WHERE id = ?1", params![id.to_string()])?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
