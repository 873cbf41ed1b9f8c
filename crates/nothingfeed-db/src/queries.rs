use crate::Database;
use crate::models::{DeletionRow, FeedRow, HandleUpdate, StatsRow, UserRow};
use anyhow::{Result, anyhow};
use nothingfeed_analysis::TextAnalysis;
use rusqlite::{Connection, Row, params};

const USER_COLUMNS: &str = "id, email, password_hash, handle, avatar_url, created_at";

const FEED_COLUMNS: &str = "d.id, d.author_id, d.char_count, d.word_count, d.sentence_count,
     d.image_count, d.link_count, d.created_at, u.handle, u.avatar_url";

impl Database {
    // -- Users --

    /// Insert a user with zeroed totals. Returns `false` without writing
    /// anything if the email or handle is already in use.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        handle: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 OR handle = ?2)",
                params![email, handle],
                |row| row.get(0),
            )?;
            if taken {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO users (id, email, password_hash, handle, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, email, password_hash, handle, created_at],
            )?;
            tx.execute("INSERT INTO user_stats (user_id) VALUES (?1)", [id])?;

            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "handle", handle))
    }

    /// Change a user's handle unless another user already owns it.
    pub fn update_handle(&self, user_id: &str, handle: &str) -> Result<HandleUpdate> {
        self.with_conn_mut(|conn| {
            let owner: Option<String> = conn
                .query_row("SELECT id FROM users WHERE handle = ?1", [handle], |row| row.get(0))
                .optional()?;

            if owner.as_deref().is_some_and(|id| id != user_id) {
                return Ok(HandleUpdate::Taken);
            }

            let changed = conn.execute(
                "UPDATE users SET handle = ?1 WHERE id = ?2",
                params![handle, user_id],
            )?;

            Ok(if changed == 0 {
                HandleUpdate::UserMissing
            } else {
                HandleUpdate::Updated
            })
        })
    }

    /// Remove a user together with their totals and deletions.
    /// Returns `false` if the user did not exist.
    pub fn delete_user(&self, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM user_stats WHERE user_id = ?1", [user_id])?;
            tx.execute("DELETE FROM deletions WHERE author_id = ?1", [user_id])?;
            let removed = tx.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }

    // -- Deletions --

    /// Persist one deletion and fold its counts into the author's totals.
    ///
    /// Both writes share a transaction: either the event and the increment
    /// are visible afterwards, or neither is. Returns the stored event joined
    /// with the author's public identity, or `None` when the author no longer
    /// exists.
    pub fn record_deletion(
        &self,
        id: &str,
        author_id: &str,
        counts: &TextAnalysis,
        created_at: &str,
    ) -> Result<Option<FeedRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let author_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                [author_id],
                |row| row.get(0),
            )?;
            if !author_exists {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO deletions
                    (id, author_id, char_count, word_count, sentence_count, image_count, link_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    author_id,
                    counts.char_count,
                    counts.word_count,
                    counts.sentence_count,
                    counts.image_count,
                    counts.link_count,
                    created_at,
                ],
            )?;

            tx.execute(
                "INSERT INTO user_stats
                    (user_id, total_chars, total_words, total_sentences, total_images, total_links, total_actions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
                 ON CONFLICT(user_id) DO UPDATE SET
                    total_chars     = total_chars     + excluded.total_chars,
                    total_words     = total_words     + excluded.total_words,
                    total_sentences = total_sentences + excluded.total_sentences,
                    total_images    = total_images    + excluded.total_images,
                    total_links     = total_links     + excluded.total_links,
                    total_actions   = total_actions   + 1",
                params![
                    author_id,
                    counts.char_count,
                    counts.word_count,
                    counts.sentence_count,
                    counts.image_count,
                    counts.link_count,
                ],
            )?;

            let row = tx.query_row(
                &format!(
                    "SELECT {FEED_COLUMNS}
                     FROM deletions d
                     JOIN users u ON u.id = d.author_id
                     WHERE d.id = ?1"
                ),
                [id],
                feed_row,
            )?;

            tx.commit()?;
            Ok(Some(row))
        })
    }

    /// One feed page, newest first, starting after `cursor`.
    ///
    /// Fetches up to `limit` rows. Returns `None` when the cursor does not
    /// name an existing deletion.
    pub fn get_feed(&self, cursor: Option<&str>, limit: u32) -> Result<Option<Vec<FeedRow>>> {
        self.with_conn(|conn| query_feed(conn, cursor, limit))
    }

    pub fn get_deletions_by_author(&self, author_id: &str, limit: u32) -> Result<Vec<DeletionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, char_count, word_count, sentence_count, image_count, link_count, created_at
                 FROM deletions
                 WHERE author_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(params![author_id, limit], deletion_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Totals --

    pub fn get_stats(&self, user_id: &str) -> Result<Option<StatsRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, total_chars, total_words, total_sentences, total_images, total_links, total_actions
                 FROM user_stats WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(StatsRow {
                        user_id: row.get(0)?,
                        total_chars: row.get(1)?,
                        total_words: row.get(2)?,
                        total_sentences: row.get(3)?,
                        total_images: row.get(4)?,
                        total_links: row.get(5)?,
                        total_actions: row.get(6)?,
                    })
                },
            )
            .optional()
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always one of our own literals, never caller input.
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password_hash: row.get(2)?,
                handle: row.get(3)?,
                avatar_url: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_feed(conn: &Connection, cursor: Option<&str>, limit: u32) -> Result<Option<Vec<FeedRow>>> {
    let rows = match cursor {
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FEED_COLUMNS}
                 FROM deletions d
                 JOIN users u ON u.id = d.author_id
                 ORDER BY d.created_at DESC, d.id DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map([limit], feed_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        Some(cursor_id) => {
            let anchor: Option<String> = conn
                .query_row("SELECT created_at FROM deletions WHERE id = ?1", [cursor_id], |row| {
                    row.get(0)
                })
                .optional()?;

            let Some(anchor_created_at) = anchor else {
                return Ok(None);
            };

            // Row-value comparison keeps pages stable when timestamps tie.
            let mut stmt = conn.prepare(&format!(
                "SELECT {FEED_COLUMNS}
                 FROM deletions d
                 JOIN users u ON u.id = d.author_id
                 WHERE (d.created_at, d.id) < (?1, ?2)
                 ORDER BY d.created_at DESC, d.id DESC
                 LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(params![anchor_created_at, cursor_id, limit], feed_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };

    Ok(Some(rows))
}

fn deletion_row(row: &Row<'_>) -> rusqlite::Result<DeletionRow> {
    Ok(DeletionRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        char_count: row.get(2)?,
        word_count: row.get(3)?,
        sentence_count: row.get(4)?,
        image_count: row.get(5)?,
        link_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn feed_row(row: &Row<'_>) -> rusqlite::Result<FeedRow> {
    Ok(FeedRow {
        deletion: deletion_row(row)?,
        author_handle: row.get(8)?,
        author_avatar_url: row.get(9)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::format_timestamp;

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn add_user(db: &Database, handle: &str) -> String {
        let id = new_id();
        let created = db
            .create_user(&id, &format!("{handle}@example.com"), handle, "hash", &format_timestamp(Utc::now()))
            .unwrap();
        assert!(created);
        id
    }

    fn counts(chars: u32, words: u32, sentences: u32, images: u32, links: u32) -> TextAnalysis {
        TextAnalysis {
            char_count: chars,
            word_count: words,
            sentence_count: sentences,
            image_count: images,
            link_count: links,
        }
    }

    fn stamp(offset_secs: i64) -> String {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        format_timestamp(base + Duration::seconds(offset_secs))
    }

    #[test]
    fn new_user_starts_with_zero_totals() {
        let db = Database::open_in_memory().unwrap();
        let id = add_user(&db, "alice");

        let stats = db.get_stats(&id).unwrap().unwrap();
        assert_eq!(stats.user_id, id);
        assert_eq!(stats.total_actions, 0);
        assert_eq!(stats.total_chars, 0);
    }

    #[test]
    fn duplicate_email_or_handle_is_refused() {
        let db = Database::open_in_memory().unwrap();
        add_user(&db, "alice");

        let now = format_timestamp(Utc::now());
        assert!(!db.create_user(&new_id(), "alice@example.com", "other", "h", &now).unwrap());
        assert!(!db.create_user(&new_id(), "new@example.com", "alice", "h", &now).unwrap());
        assert!(db.create_user(&new_id(), "bob@example.com", "bob", "h", &now).unwrap());
    }

    #[test]
    fn record_deletion_updates_totals() {
        let db = Database::open_in_memory().unwrap();
        let author = add_user(&db, "alice");

        let row = db
            .record_deletion(&new_id(), &author, &counts(19, 4, 2, 0, 1), &stamp(0))
            .unwrap()
            .unwrap();
        assert_eq!(row.author_handle, "alice");
        assert_eq!(row.deletion.char_count, 19);
        assert!(row.author_avatar_url.is_none());

        db.record_deletion(&new_id(), &author, &counts(3, 1, 0, 2, 0), &stamp(1))
            .unwrap();

        let stats = db.get_stats(&author).unwrap().unwrap();
        assert_eq!(stats.total_chars, 22);
        assert_eq!(stats.total_words, 5);
        assert_eq!(stats.total_sentences, 2);
        assert_eq!(stats.total_images, 2);
        assert_eq!(stats.total_links, 1);
        assert_eq!(stats.total_actions, 2);
    }

    #[test]
    fn totals_are_created_lazily() {
        let db = Database::open_in_memory().unwrap();
        let author = add_user(&db, "alice");
        db.with_conn(|conn| {
            conn.execute("DELETE FROM user_stats WHERE user_id = ?1", [&author])?;
            Ok(())
        })
        .unwrap();
        assert!(db.get_stats(&author).unwrap().is_none());

        db.record_deletion(&new_id(), &author, &counts(5, 1, 0, 0, 0), &stamp(0))
            .unwrap();

        let stats = db.get_stats(&author).unwrap().unwrap();
        assert_eq!(stats.total_chars, 5);
        assert_eq!(stats.total_actions, 1);
    }

    #[test]
    fn failed_record_leaves_no_partial_state() {
        let db = Database::open_in_memory().unwrap();
        let author = add_user(&db, "alice");
        let id = new_id();
        db.record_deletion(&id, &author, &counts(1, 1, 0, 0, 0), &stamp(0))
            .unwrap();

        // Reusing the id violates the primary key.
        assert!(
            db.record_deletion(&id, &author, &counts(7, 1, 0, 0, 0), &stamp(1))
                .is_err()
        );
        // Unknown author: nothing is written.
        assert!(
            db.record_deletion(&new_id(), &new_id(), &counts(7, 1, 0, 0, 0), &stamp(2))
                .unwrap()
                .is_none()
        );

        let stats = db.get_stats(&author).unwrap().unwrap();
        assert_eq!(stats.total_chars, 1);
        assert_eq!(stats.total_actions, 1);

        let total_rows: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM deletions", [], |r| r.get(0))?))
            .unwrap();
        let stats_rows: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM user_stats", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(total_rows, 1);
        assert_eq!(stats_rows, 1);
    }

    #[test]
    fn failed_totals_update_rolls_back_the_event() {
        let db = Database::open_in_memory().unwrap();
        let author = add_user(&db, "alice");
        db.record_deletion(&new_id(), &author, &counts(4, 1, 0, 0, 0), &stamp(0))
            .unwrap();

        // The event insert succeeds, then the totals upsert aborts.
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER stats_insert_fails BEFORE INSERT ON user_stats
                 BEGIN SELECT RAISE(ABORT, 'stats unavailable'); END;
                 CREATE TRIGGER stats_update_fails BEFORE UPDATE ON user_stats
                 BEGIN SELECT RAISE(ABORT, 'stats unavailable'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let err = db
            .record_deletion(&new_id(), &author, &counts(9, 2, 1, 0, 0), &stamp(1))
            .unwrap_err();
        assert!(format!("{err:#}").contains("stats unavailable"));

        let rows = db.get_deletions_by_author(&author, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].char_count, 4);

        let stats = db.get_stats(&author).unwrap().unwrap();
        assert_eq!(stats.total_chars, 4);
        assert_eq!(stats.total_actions, 1);
    }

    #[test]
    fn recording_for_a_removed_author_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let author = add_user(&db, "alice");
        assert!(db.delete_user(&author).unwrap());

        let id = new_id();
        assert!(
            db.record_deletion(&id, &author, &counts(3, 1, 0, 0, 0), &stamp(0))
                .unwrap()
                .is_none()
        );
        assert!(db.get_feed(Some(&id), 10).unwrap().is_none());
        assert!(db.get_stats(&author).unwrap().is_none());
    }

    #[test]
    fn concurrent_submissions_do_not_lose_increments() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let author = add_user(&db, "alice");

        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let db = db.clone();
                let author = author.clone();
                thread::spawn(move || {
                    for i in 0..25u32 {
                        let c = counts(t + i, 1, i % 3, t % 2, 1);
                        db.record_deletion(&new_id(), &author, &c, &format_timestamp(Utc::now()))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = db.get_stats(&author).unwrap().unwrap();
        let rows = db.get_deletions_by_author(&author, 1000).unwrap();
        assert_eq!(rows.len(), 200);
        assert_eq!(stats.total_actions, 200);
        assert_eq!(stats.total_chars, rows.iter().map(|r| r.char_count).sum::<i64>());
        assert_eq!(stats.total_words, rows.iter().map(|r| r.word_count).sum::<i64>());
        assert_eq!(stats.total_sentences, rows.iter().map(|r| r.sentence_count).sum::<i64>());
        assert_eq!(stats.total_images, rows.iter().map(|r| r.image_count).sum::<i64>());
        assert_eq!(stats.total_links, rows.iter().map(|r| r.link_count).sum::<i64>());
    }

    #[test]
    fn feed_pages_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");

        let mut ids = Vec::new();
        for i in 0..5 {
            let id = new_id();
            let author = if i % 2 == 0 { &alice } else { &bob };
            db.record_deletion(&id, author, &counts(1, 1, 0, 0, 0), &stamp(i))
                .unwrap();
            ids.push(id);
        }

        let first = db.get_feed(None, 3).unwrap().unwrap();
        let first_ids: Vec<_> = first.iter().map(|r| r.deletion.id.clone()).collect();
        assert_eq!(first_ids, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);
        assert_eq!(first[1].author_handle, "bob");

        let second = db.get_feed(Some(&ids[2]), 3).unwrap().unwrap();
        let second_ids: Vec<_> = second.iter().map(|r| r.deletion.id.clone()).collect();
        assert_eq!(second_ids, vec![ids[1].clone(), ids[0].clone()]);
    }

    #[test]
    fn feed_breaks_timestamp_ties_by_id() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");

        let mut ids: Vec<String> = (0..4).map(|_| new_id()).collect();
        for id in &ids {
            db.record_deletion(id, &alice, &counts(1, 1, 0, 0, 0), &stamp(0))
                .unwrap();
        }
        ids.sort();
        ids.reverse();

        let first = db.get_feed(None, 2).unwrap().unwrap();
        let cursor = first[1].deletion.id.clone();
        let second = db.get_feed(Some(&cursor), 2).unwrap().unwrap();

        let seen: Vec<_> = first
            .iter()
            .chain(second.iter())
            .map(|r| r.deletion.id.clone())
            .collect();
        assert_eq!(seen, ids);
    }

    #[test]
    fn unknown_cursor_is_reported() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_feed(Some("missing"), 10).unwrap().is_none());
    }

    #[test]
    fn update_handle_checks_ownership() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");
        add_user(&db, "bob");

        assert_eq!(db.update_handle(&alice, "bob").unwrap(), HandleUpdate::Taken);
        assert_eq!(db.update_handle(&alice, "alice").unwrap(), HandleUpdate::Updated);
        assert_eq!(db.update_handle(&alice, "carol").unwrap(), HandleUpdate::Updated);
        assert_eq!(db.update_handle(&new_id(), "dave").unwrap(), HandleUpdate::UserMissing);

        assert!(db.get_user_by_handle("carol").unwrap().is_some());
        assert!(db.get_user_by_handle("alice").unwrap().is_none());
    }

    #[test]
    fn delete_user_removes_everything_they_own() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        db.record_deletion(&new_id(), &alice, &counts(1, 1, 0, 0, 0), &stamp(0))
            .unwrap();
        db.record_deletion(&new_id(), &bob, &counts(2, 1, 0, 0, 0), &stamp(1))
            .unwrap();

        assert!(db.delete_user(&alice).unwrap());
        assert!(!db.delete_user(&alice).unwrap());

        assert!(db.get_user_by_id(&alice).unwrap().is_none());
        assert!(db.get_stats(&alice).unwrap().is_none());
        assert!(db.get_deletions_by_author(&alice, 10).unwrap().is_empty());

        let feed = db.get_feed(None, 10).unwrap().unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author_handle, "bob");
    }
}
