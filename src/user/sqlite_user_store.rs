use super::auth::{AuthToken, AuthTokenValue, StreamlyzeHasher, UserAuthCredentials};
use super::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
use crate::sql_column;
use crate::sqlite_persistence::{
    open_versioned_db, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sql_column!("id", SqlType::Integer, is_primary_key = true, is_unique = true),
        sql_column!("handle", SqlType::Text, non_null = true, is_unique = true),
        sql_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};

const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sql_column!("user_id", SqlType::Integer, non_null = true),
        sql_column!("value", SqlType::Text, non_null = true, is_unique = true),
        sql_column!("created", SqlType::Integer, non_null = true),
        sql_column!("last_used", SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};

const PASSWORD_CREDENTIALS_TABLE_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sql_column!("user_id", SqlType::Integer, non_null = true, is_unique = true),
        sql_column!("salt", SqlType::Text, non_null = true),
        sql_column!("hash", SqlType::Text, non_null = true),
        sql_column!("hasher", SqlType::Text, non_null = true),
        sql_column!("created", SqlType::Integer, non_null = true),
        sql_column!("last_used", SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        AUTH_TOKEN_TABLE_V_0,
        PASSWORD_CREDENTIALS_TABLE_V_0,
    ],
    migration: None,
}];

fn to_unix_secs(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn from_unix_secs(secs: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), USER_VERSIONED_SCHEMAS)
            .context("Failed to open user database")?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_auth_token(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
        Ok(AuthToken {
            user_id: row.get(0)?,
            value: AuthTokenValue(row.get(1)?),
            created: from_unix_secs(row.get(2)?),
            last_used: row.get::<_, Option<i64>>(3)?.map(from_unix_secs),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (handle) VALUES (?1)",
            params![user_handle],
        )
        .with_context(|| format!("Failed to create user {}", user_handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let handle = conn
            .query_row(
                "SELECT handle FROM user WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(handle)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        let id = conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![user_handle],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn get_all_user_handles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT handle FROM user ORDER BY id")?;
        let handles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(handles)
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let conn = self.conn.lock().unwrap();
        let credentials = conn
            .query_row(
                "SELECT c.user_id, c.salt, c.hash, c.hasher, c.created, c.last_used
                 FROM user_password_credentials c
                 JOIN user u ON u.id = c.user_id
                 WHERE u.handle = ?1",
                params![user_handle],
                |row| {
                    Ok((
                        row.get::<_, usize>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .optional()?;

        match credentials {
            None => Ok(None),
            Some((user_id, salt, hash, hasher, created, last_used)) => {
                let hasher = StreamlyzeHasher::from_str(&hasher)?;
                Ok(Some(UserAuthCredentials {
                    user_id,
                    salt,
                    hash,
                    hasher,
                    created: from_unix_secs(created),
                    last_used: last_used.map(from_unix_secs),
                }))
            }
        }
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO user_password_credentials
             (user_id, salt, hash, hasher, created, last_used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
                to_unix_secs(credentials.created),
                credentials.last_used.map(to_unix_secs),
            ],
        )?;
        Ok(())
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let auth_token = conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![token.0],
                Self::row_to_auth_token,
            )
            .optional()?;
        Ok(auth_token)
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let auth_token = conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![token.0],
                Self::row_to_auth_token,
            )
            .optional()?;

        if auth_token.is_some() {
            conn.execute("DELETE FROM auth_token WHERE value = ?1", params![token.0])?;
        }
        Ok(auth_token)
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_token SET last_used = cast(strftime('%s','now') as int) WHERE value = ?1",
            params![token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.user_id,
                token.value.0,
                to_unix_secs(token.created),
                token.last_used.map(to_unix_secs),
            ],
        )?;
        Ok(())
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM auth_token
             WHERE COALESCE(last_used, created)
                 < cast(strftime('%s','now') as int) - ?1 * 86400",
            params![unused_for_days],
        )?;
        Ok(deleted)
    }
}
