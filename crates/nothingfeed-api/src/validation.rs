//! Request-shape checks, run before any handler logic touches the input.
//!
//! Each request type lists its constraints against an [`Issues`] collector;
//! failures come back as one `InvalidInput` error carrying every issue.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use nothingfeed_types::api::{ComposeRequest, FieldIssue};

use crate::error::ApiError;

pub const PASSWORD_MIN: usize = 8;
pub const HANDLE_MIN: usize = 3;
pub const HANDLE_MAX: usize = 20;

static HANDLE_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn handle_regex() -> &'static Regex {
    HANDLE_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        Regex::new("^[A-Za-z0-9_]+$")
            .unwrap_or_else(|error| panic!("handle regex failed to compile: {error}"))
    })
}

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

#[derive(Debug, Default)]
pub struct Issues(Vec<FieldIssue>);

impl Issues {
    pub fn check(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.0.push(FieldIssue {
                field: field.into(),
                message: message.into(),
            });
        }
        self
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::InvalidInput(self.0))
        }
    }
}

pub fn is_email(value: &str) -> bool {
    email_regex().is_match(value)
}

pub fn is_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Handle rules shared by registration and handle changes.
pub fn check_handle(issues: &mut Issues, handle: &str) {
    let len = handle.chars().count();
    issues
        .check(len >= HANDLE_MIN, "handle", format!("Handle must be at least {HANDLE_MIN} characters"))
        .check(len <= HANDLE_MAX, "handle", format!("Handle must be at most {HANDLE_MAX} characters"))
        .check(
            handle_regex().is_match(handle),
            "handle",
            "Handle can only contain letters, numbers, and underscores",
        );
}

pub fn registration(email: &str, password: &str, handle: &str) -> Result<(), ApiError> {
    let mut issues = Issues::default();
    issues
        .check(is_email(email), "email", "Invalid email address")
        .check(
            password.chars().count() >= PASSWORD_MIN,
            "password",
            format!("Password must be at least {PASSWORD_MIN} characters"),
        );
    check_handle(&mut issues, handle);
    issues.finish()
}

pub fn handle_change(handle: &str) -> Result<(), ApiError> {
    let mut issues = Issues::default();
    check_handle(&mut issues, handle);
    issues.finish()
}

pub fn compose(req: &ComposeRequest, max_text_length: usize) -> Result<(), ApiError> {
    let mut issues = Issues::default();
    issues.check(
        req.text.chars().count() <= max_text_length,
        "text",
        format!("Text too long (max {max_text_length} characters)"),
    );
    for (i, link) in req.links.iter().enumerate() {
        issues.check(is_url(link), format!("links.{i}"), "Invalid url");
    }
    issues.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues_of(result: Result<(), ApiError>) -> Vec<FieldIssue> {
        match result {
            Err(ApiError::InvalidInput(issues)) => issues,
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(()) => Vec::new(),
        }
    }

    fn compose_req(text: &str, links: &[&str]) -> ComposeRequest {
        ComposeRequest {
            text: text.to_string(),
            images: Vec::new(),
            links: links.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn valid_registration() {
        assert!(registration("a@b.co", "longenough", "good_handle1").is_ok());
    }

    #[test]
    fn registration_reports_every_issue() {
        let issues = issues_of(registration("nope", "short", "x!"));
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "password", "handle", "handle"]);
    }

    #[test]
    fn handle_bounds() {
        assert!(handle_change("abc").is_ok());
        assert!(handle_change(&"a".repeat(HANDLE_MAX)).is_ok());
        assert_eq!(issues_of(handle_change("ab")).len(), 1);
        assert_eq!(issues_of(handle_change(&"a".repeat(HANDLE_MAX + 1))).len(), 1);
        assert_eq!(issues_of(handle_change("with space")).len(), 1);
    }

    #[test]
    fn compose_text_limit_counts_characters() {
        assert!(compose(&compose_req(&"é".repeat(500), &[]), 500).is_ok());
        let issues = issues_of(compose(&compose_req(&"a".repeat(501), &[]), 500));
        assert_eq!(issues[0].field, "text");
    }

    #[test]
    fn compose_links_must_be_urls() {
        assert!(compose(&compose_req("", &["http://x.com/a", "mailto:me@x.com"]), 500).is_ok());
        let issues = issues_of(compose(&compose_req("", &["http://x.com", "not a url"]), 500));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "links.1");
    }
}
