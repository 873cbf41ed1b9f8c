use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use nothingfeed_analysis::TextAnalysis;
use nothingfeed_db::models::{DeletionRow, FeedRow, StatsRow, UserRow};
use nothingfeed_types::api::{ProfileUser, SessionUser};
use nothingfeed_types::models::{Author, Deletion, FeedItem, UserTotals};

pub fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt created_at '{}' on '{}': {}", raw, owner, e);
        DateTime::default()
    })
}

fn count(value: i64, field: &str, owner: &str) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| {
        warn!("Out-of-range {} {} on '{}'", field, value, owner);
        0
    })
}

pub fn deletion(row: DeletionRow) -> Deletion {
    Deletion {
        id: parse_id(&row.id, "deletion id"),
        counts: TextAnalysis {
            char_count: count(row.char_count, "char_count", &row.id),
            word_count: count(row.word_count, "word_count", &row.id),
            sentence_count: count(row.sentence_count, "sentence_count", &row.id),
            image_count: count(row.image_count, "image_count", &row.id),
            link_count: count(row.link_count, "link_count", &row.id),
        },
        created_at: parse_timestamp(&row.created_at, &row.id),
    }
}

pub fn feed_item(row: FeedRow) -> FeedItem {
    FeedItem {
        deletion: deletion(row.deletion),
        author: Author {
            handle: row.author_handle,
            avatar_url: row.author_avatar_url,
        },
    }
}

pub fn totals(row: StatsRow) -> UserTotals {
    UserTotals {
        total_chars: row.total_chars,
        total_words: row.total_words,
        total_sentences: row.total_sentences,
        total_images: row.total_images,
        total_links: row.total_links,
        total_actions: row.total_actions,
    }
}

pub fn session_user(row: UserRow) -> SessionUser {
    SessionUser {
        id: parse_id(&row.id, "user id"),
        created_at: parse_timestamp(&row.created_at, &row.id),
        email: row.email,
        handle: row.handle,
        avatar_url: row.avatar_url,
    }
}

pub fn profile_user(row: UserRow) -> ProfileUser {
    ProfileUser {
        id: parse_id(&row.id, "user id"),
        created_at: parse_timestamp(&row.created_at, &row.id),
        handle: row.handle,
        avatar_url: row.avatar_url,
    }
}
