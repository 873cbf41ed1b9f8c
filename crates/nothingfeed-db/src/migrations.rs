use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, deletions, user_stats)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                handle          TEXT NOT NULL UNIQUE,
                avatar_url      TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE deletions (
                id              TEXT PRIMARY KEY,
                author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                char_count      INTEGER NOT NULL CHECK (char_count >= 0),
                word_count      INTEGER NOT NULL CHECK (word_count >= 0),
                sentence_count  INTEGER NOT NULL CHECK (sentence_count >= 0),
                image_count     INTEGER NOT NULL CHECK (image_count >= 0),
                link_count      INTEGER NOT NULL CHECK (link_count >= 0),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_deletions_feed
                ON deletions(created_at DESC, id DESC);

            CREATE INDEX idx_deletions_author
                ON deletions(author_id, created_at DESC);

            CREATE TABLE user_stats (
                user_id          TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                total_chars      INTEGER NOT NULL DEFAULT 0,
                total_words      INTEGER NOT NULL DEFAULT 0,
                total_sentences  INTEGER NOT NULL DEFAULT 0,
                total_images     INTEGER NOT NULL DEFAULT 0,
                total_links      INTEGER NOT NULL DEFAULT 0,
                total_actions    INTEGER NOT NULL DEFAULT 0
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
