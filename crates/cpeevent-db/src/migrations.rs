use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            student_id      TEXT PRIMARY KEY,
            first_name      TEXT NOT NULL,
            last_name       TEXT NOT NULL,
            year            INTEGER NOT NULL,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            phone_number    TEXT NOT NULL,
            username        TEXT NOT NULL,
            access          INTEGER NOT NULL DEFAULT 1,
            token           TEXT,
            refresh_token   TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS events (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            n_participant   INTEGER NOT NULL DEFAULT 0,
            n_staff         INTEGER NOT NULL DEFAULT 0,
            start_date      TEXT,
            end_date        TEXT,
            president       TEXT NOT NULL DEFAULT '',
            kind            TEXT NOT NULL DEFAULT '',
            roles           TEXT NOT NULL DEFAULT '[]',
            icon            TEXT,
            poster          TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Membership rows keep insertion order through rowid. Student ids are
        -- not foreign keys: members whose user row is gone are skipped on read.
        CREATE TABLE IF NOT EXISTS event_participants (
            event_id        TEXT NOT NULL REFERENCES events(id),
            student_id      TEXT NOT NULL,
            UNIQUE(event_id, student_id)
        );

        CREATE TABLE IF NOT EXISTS event_staff (
            event_id        TEXT NOT NULL REFERENCES events(id),
            student_id      TEXT NOT NULL,
            role            TEXT NOT NULL DEFAULT '',
            UNIQUE(event_id, student_id)
        );

        CREATE TABLE IF NOT EXISTS posts (
            id              TEXT PRIMARY KEY,
            event_id        TEXT NOT NULL REFERENCES events(id),
            kind            TEXT NOT NULL,
            assign_to       TEXT NOT NULL DEFAULT '[]',
            public          INTEGER NOT NULL DEFAULT 0,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            post_date       TEXT NOT NULL,
            end_date        TEXT,
            author          TEXT NOT NULL,
            payload         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_event
            ON posts(event_id, post_date);

        CREATE TABLE IF NOT EXISTS answers (
            id              TEXT PRIMARY KEY,
            post_id         TEXT NOT NULL REFERENCES posts(id),
            student_id      TEXT NOT NULL,
            kind            TEXT NOT NULL,
            payload         TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            UNIQUE(post_id, student_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
