use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nothingfeed_analysis::TextAnalysis;

/// Public identity shown next to every feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub handle: String,
    pub avatar_url: Option<String>,
}

/// One persisted deletion. Only counts, never content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deletion {
    pub id: Uuid,
    #[serde(flatten)]
    pub counts: TextAnalysis,
    pub created_at: DateTime<Utc>,
}

/// A deletion joined with its author, as rendered in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    #[serde(flatten)]
    pub deletion: Deletion,
    pub author: Author,
}

/// Lifetime running sums over a user's deletions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotals {
    pub total_chars: i64,
    pub total_words: i64,
    pub total_sentences: i64,
    pub total_images: i64,
    pub total_links: i64,
    pub total_actions: i64,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn feed_item_wire_shape() {
        let item = FeedItem {
            deletion: Deletion {
                id: Uuid::nil(),
                counts: TextAnalysis {
                    char_count: 19,
                    word_count: 4,
                    sentence_count: 2,
                    image_count: 0,
                    link_count: 1,
                },
                created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            },
            author: Author {
                handle: "alice".to_string(),
                avatar_url: None,
            },
        };

        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "charCount": 19,
                "wordCount": 4,
                "sentenceCount": 2,
                "imageCount": 0,
                "linkCount": 1,
                "createdAt": "2026-03-01T09:30:00Z",
                "author": { "handle": "alice", "avatarUrl": null },
            })
        );
    }

    #[test]
    fn totals_default_to_zero() {
        let value = serde_json::to_value(UserTotals::default()).unwrap();
        assert_eq!(value["totalActions"], 0);
        assert_eq!(value["totalChars"], 0);
    }
}
