use crate::text::TextAnalysis;

/// Human-readable line for a deletion, e.g.
/// "Deleted 19 characters, 4 words, 2 sentences and 1 link".
pub fn format_deletion_summary(analysis: &TextAnalysis) -> String {
    let parts: Vec<String> = [
        (analysis.char_count, "character"),
        (analysis.word_count, "word"),
        (analysis.sentence_count, "sentence"),
        (analysis.image_count, "image"),
        (analysis.link_count, "link"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, noun)| {
        let plural = if count == 1 { "" } else { "s" };
        format!("{count} {noun}{plural}")
    })
    .collect();

    match parts.as_slice() {
        [] => "Nothing was deleted".to_string(),
        [only] => format!("Deleted {only}"),
        [init @ .., last] => format!("Deleted {} and {last}", init.join(", ")),
    }
}
