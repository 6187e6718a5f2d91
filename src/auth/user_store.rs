//! User Storage
//! Mission: Persist user accounts in SQLite behind a repository trait

use crate::auth::models::{User, UserRole};
use crate::db::{self, SharedConnection, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

/// Lookup and persistence contract the auth core depends on
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn create(&self, user: &User) -> Result<(), StoreError>;
    async fn update(&self, user: &User) -> Result<(), StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, phone, roles, is_active, created_at, updated_at";

/// User storage with SQLite backend
pub struct SqliteUserStore {
    conn: SharedConnection,
}

impl SqliteUserStore {
    /// Wrap a connection and make sure the schema exists
    pub fn new(conn: SharedConnection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store.init_db()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                phone TEXT NOT NULL,
                roles TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn encode_roles(roles: &[UserRole]) -> Result<String, StoreError> {
        if roles.is_empty() {
            return Err(StoreError::EmptyRoleSet);
        }
        Ok(roles
            .iter()
            .map(UserRole::as_str)
            .collect::<Vec<_>>()
            .join(","))
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<RawUser> {
        Ok(RawUser {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            phone: row.get(3)?,
            roles: row.get(4)?,
            is_active: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn query_one(&self, clause: &str, key: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause} = ?1");
        let raw = conn
            .query_row(&sql, params![key], Self::row_to_user)
            .optional()?;
        raw.map(RawUser::into_user).transpose()
    }
}

/// Row as stored; converted to [`User`] outside the rusqlite closure so that
/// parse failures surface as [`StoreError::Corrupt`].
struct RawUser {
    id: String,
    email: String,
    password_hash: String,
    phone: String,
    roles: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl RawUser {
    fn into_user(self) -> Result<User, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Corrupt(format!("user id {}: {e}", self.id)))?;
        let roles = self
            .roles
            .split(',')
            .map(|code| {
                UserRole::from_code(code)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown role {code:?} on {id}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if roles.is_empty() {
            return Err(StoreError::Corrupt(format!("user {id} has no roles")));
        }

        Ok(User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            phone: self.phone,
            roles,
            is_active: self.is_active,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

#[async_trait]
impl UserRepository for SqliteUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.query_one("email", email)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.query_one("id", &id.to_string())
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let roles = Self::encode_roles(&user.roles)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, phone, roles, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.phone,
                roles,
                user.is_active,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                StoreError::EmailTaken
            } else {
                StoreError::Database(e)
            }
        })?;

        info!(user_id = %user.id, email = %user.email, roles = %roles, "Created user");
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let roles = Self::encode_roles(&user.roles)?;
        let conn = self.conn.lock();
        let rows_affected = conn
            .execute(
                "UPDATE users
                 SET email = ?2, password_hash = ?3, phone = ?4, roles = ?5, is_active = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    user.id.to_string(),
                    user.email,
                    user.password_hash,
                    user.phone,
                    roles,
                    user.is_active,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| {
                if db::is_unique_violation(&e) {
                    StoreError::EmailTaken
                } else {
                    StoreError::Database(e)
                }
            })?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))?;
        let raws = stmt
            .query_map([], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawUser::into_user).collect()
    }
}
