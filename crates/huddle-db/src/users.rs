use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use huddle_types::models::UserId;

use crate::models::{UserRow, UserSummaryRow};
use crate::{Database, Result};

impl Database {
    /// Inserts a user and returns the new id. A taken username surfaces as a
    /// constraint violation.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<UserId> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user (username, email, password_hash) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            let user_id = conn.last_insert_rowid();
            info!(user_id, "Created user {}", username);
            Ok(user_id)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, username, email, password_hash FROM user
                     WHERE email = ?1
                     ORDER BY user_id
                     LIMIT 1",
                    [email],
                    user_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Every user whose username equals `first` or `second`.
    ///
    /// Login passes `None` for `second`; more than one hit then means the
    /// table holds duplicate usernames.
    pub fn find_users(&self, first: &str, second: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, username, email, password_hash FROM user
                 WHERE username = ?1 OR username = ?2
                 ORDER BY user_id",
            )?;
            let rows = stmt
                .query_map((first, second), user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Exact username + stored hash match.
    pub fn get_user(&self, username: &str, password_hash: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_credentials(conn, username, password_hash))
    }

    pub fn get_all_users(&self) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id, username FROM user ORDER BY user_id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UserSummaryRow {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user_by_credentials(
    conn: &Connection,
    username: &str,
    password_hash: &str,
) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, username, email, password_hash FROM user
         WHERE username = ?1 AND password_hash = ?2",
    )?;
    let row = stmt.query_row((username, password_hash), user_row).optional()?;
    Ok(row)
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        user_id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
    })
}
