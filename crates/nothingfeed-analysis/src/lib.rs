/// NothingFeed Analysis Library
///
/// Turns a submitted post into counts and nothing else. The text itself never
/// leaves this crate: callers get a `TextAnalysis` back and drop the input.
///
/// No I/O and no shared mutable state, so everything here is safe to call
/// from any thread.

pub mod summary;
pub mod text;

pub use summary::format_deletion_summary;
pub use text::{NoContent, TextAnalysis, analyze_submission, analyze_text};
