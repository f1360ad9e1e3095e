//! User identity registry.
//!
//! Authentication (login, tokens, passwords) lives in an external
//! collaborator; this module only stores who users are so tasks can
//! reference owners, assignees, and authors.

use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::User;
use anyhow::Result;
use rusqlite::{params, Connection, Row};

pub(crate) fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
    })
}

/// Internal helper to get a user using an existing connection.
pub(crate) fn get_user_internal(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ?1")?;

    let result = stmt.query_row(params![user_id], parse_user_row);

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a new user. Usernames are unique.
    pub fn create_user(&self, username: &str, email: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::missing_field("username").into());
        }
        if email.trim().is_empty() {
            return Err(ApiError::missing_field("email").into());
        }

        let now = now_ms();

        self.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                params![username],
                |row| row.get(0),
            )?;
            if taken {
                return Err(
                    ApiError::already_exists(format!("User '{}'", username)).into(),
                );
            }

            conn.execute(
                "INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3)",
                params![username, email, now],
            )?;

            Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                email: email.to_string(),
                created_at: now,
            })
        })
    }

    /// Get a user by ID.
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_internal(conn, user_id))
    }

    /// Get a user by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM users WHERE username = ?1")?;

            let result = stmt.query_row(params![username], parse_user_row);

            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}
