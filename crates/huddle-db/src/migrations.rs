use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // All or nothing: a half-built schema without its version row would
        // fail every later start.
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(
            "
            CREATE TABLE user (
                user_id         INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL,
                password_hash   TEXT NOT NULL
            );

            CREATE TABLE room (
                room_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL
            );

            CREATE TABLE room_user (
                room_user_id        INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id             INTEGER NOT NULL REFERENCES room(room_id),
                user_id             INTEGER NOT NULL REFERENCES user(user_id),
                last_read_message   INTEGER
            );

            CREATE INDEX idx_room_user_room ON room_user(room_id, user_id);
            CREATE INDEX idx_room_user_user ON room_user(user_id);

            CREATE TABLE message (
                message_id      INTEGER PRIMARY KEY AUTOINCREMENT,
                room_user_id    INTEGER NOT NULL REFERENCES room_user(room_user_id),
                text            TEXT NOT NULL,
                sent_datetime   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_message_room_user ON message(room_user_id, message_id);

            CREATE TABLE message_reaction (
                message_reaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id          INTEGER NOT NULL REFERENCES message(message_id),
                user_id             INTEGER NOT NULL REFERENCES user(user_id),
                emoji               TEXT NOT NULL
            );

            CREATE INDEX idx_message_reaction_message ON message_reaction(message_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerunning_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn failed_migration_leaves_no_partial_schema() {
        let conn = Connection::open_in_memory().unwrap();
        // Clashes with the `room` table, which is created after `user`.
        conn.execute_batch("CREATE TABLE room (legacy TEXT);").unwrap();

        assert!(run(&conn).is_err());

        let user_tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(user_tables, 0);
        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 0);
    }
}
