/// Database row types: these map directly to SQLite rows.
/// Distinct from nothingfeed-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub handle: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct DeletionRow {
    pub id: String,
    pub author_id: String,
    pub char_count: i64,
    pub word_count: i64,
    pub sentence_count: i64,
    pub image_count: i64,
    pub link_count: i64,
    pub created_at: String,
}

/// A deletion joined with its author's public identity.
#[derive(Debug)]
pub struct FeedRow {
    pub deletion: DeletionRow,
    pub author_handle: String,
    pub author_avatar_url: Option<String>,
}

pub struct StatsRow {
    pub user_id: String,
    pub total_chars: i64,
    pub total_words: i64,
    pub total_sentences: i64,
    pub total_images: i64,
    pub total_links: i64,
    pub total_actions: i64,
}

/// Outcome of a handle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleUpdate {
    Updated,
    Taken,
    UserMissing,
}
