use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Counts derived from one submission. Built once, never mutated after it has
/// been folded into an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnalysis {
    pub char_count: u32,
    pub word_count: u32,
    pub sentence_count: u32,
    pub image_count: u32,
    pub link_count: u32,
}

/// The submission had nothing measurable to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no content to delete")]
pub struct NoContent;

impl TextAnalysis {
    /// Add images and links that were attached alongside the text.
    pub fn with_declared(mut self, images: &[String], links: &[String]) -> Self {
        self.image_count = self.image_count.saturating_add(count_u32(images.len()));
        self.link_count = self.link_count.saturating_add(count_u32(links.len()));
        self
    }

    /// Words and sentences alone don't count: they imply characters.
    pub fn has_content(&self) -> bool {
        self.char_count > 0 || self.image_count > 0 || self.link_count > 0
    }
}

static SENTENCE_RE: OnceLock<Regex> = OnceLock::new();
static WORD_CHAR_RE: OnceLock<Regex> = OnceLock::new();
static IMAGE_RE: OnceLock<Regex> = OnceLock::new();
static LINK_RE: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("analysis regex {pattern:?} failed to compile: {error}"))
    })
}

fn sentence_regex() -> &'static Regex {
    compiled(&SENTENCE_RE, r"[^.!?]*[.!?]+")
}

fn word_char_regex() -> &'static Regex {
    compiled(&WORD_CHAR_RE, r"\w")
}

/// `<img ...>` tags, Markdown images and bare URLs ending in an image extension.
fn image_regex() -> &'static Regex {
    compiled(
        &IMAGE_RE,
        r"(?i)<img[^>]*>|!\[[^\]]*\]\([^)]*\)|https?://[^\s]*\.(?:jpg|jpeg|png|gif|webp|svg)",
    )
}

/// Bare http(s) URLs and Markdown links. `![alt](url)` contains a Markdown
/// link too, so a Markdown image also counts here.
fn link_regex() -> &'static Regex {
    compiled(&LINK_RE, r"(?i)https?://[^\s]+|\[[^\]]*\]\([^)]+\)")
}

/// Count characters, words, sentences, images and links in `text`.
///
/// Total over every input: an empty string yields all zeroes.
pub fn analyze_text(text: &str) -> TextAnalysis {
    let char_count = text.chars().filter(|c| !c.is_whitespace()).count();
    let word_count = text.split_whitespace().count();

    // A sentence needs explicit termination and at least one word character.
    let sentence_count = sentence_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty() && word_char_regex().is_match(s))
        .count();

    let image_count = image_regex().find_iter(text).count();
    let link_count = link_regex().find_iter(text).count();

    TextAnalysis {
        char_count: count_u32(char_count),
        word_count: count_u32(word_count),
        sentence_count: count_u32(sentence_count),
        image_count: count_u32(image_count),
        link_count: count_u32(link_count),
    }
}

/// Analyze `text`, add the declared attachments and reject empty submissions.
pub fn analyze_submission(
    text: &str,
    images: &[String],
    links: &[String],
) -> Result<TextAnalysis, NoContent> {
    let analysis = analyze_text(text).with_declared(images, links);
    if analysis.has_content() {
        Ok(analysis)
    } else {
        Err(NoContent)
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
