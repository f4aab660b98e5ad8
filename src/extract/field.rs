//! Field extraction over ordered rule lists
//!
//! Rules are evaluated strictly in priority order: the first rule whose first
//! match yields non-empty text decides the field, looser heuristics later in
//! the list only run when every better selector came up empty.

use crate::extract::rules::FieldRules;
use scraper::{ElementRef, Html, Selector};

/// Marker appended to truncated text
const TRUNCATION_MARKER: &str = "...";

/// Block-level children whose texts are kept as separate description lines
const DESCRIPTION_BLOCKS: &str = "p, ul, li, div";

/// Collapses whitespace runs to single spaces, trims, and caps the length
///
/// Text longer than `max_length` characters is cut so that, with the
/// truncation marker appended, it is exactly `max_length` characters long.
///
/// # Examples
///
/// ```
/// use event_harvester::extract::normalize_text;
///
/// assert_eq!(normalize_text("  Sat,\n  Oct 12 \t 7 PM ", None), "Sat, Oct 12 7 PM");
/// assert_eq!(normalize_text("abcdefghij", Some(8)), "abcde...");
/// ```
pub fn normalize_text(text: &str, max_length: Option<usize>) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(collapsed, max_length)
}

/// Like [`normalize_text`] but keeps line breaks, dropping blank lines
pub fn normalize_lines(text: &str, max_length: Option<usize>) -> String {
    let joined = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    truncate(joined, max_length)
}

fn truncate(text: String, max_length: Option<usize>) -> String {
    match max_length {
        Some(max) if text.chars().count() > max => {
            let keep = max.saturating_sub(TRUNCATION_MARKER.len());
            let mut cut: String = text.chars().take(keep).collect();
            cut.push_str(TRUNCATION_MARKER);
            cut
        }
        _ => text,
    }
}

/// Flattened text of an element with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<Vec<_>>().join(" "), None)
}

/// Description text of a container
///
/// When the container holds block or list elements their individual texts
/// become separate lines; otherwise the container's flattened text is used.
pub fn block_text(element: ElementRef<'_>) -> String {
    let blocks = match Selector::parse(DESCRIPTION_BLOCKS) {
        Ok(selector) => selector,
        Err(_) => return element_text(element),
    };

    let lines: Vec<String> = element
        .select(&blocks)
        .filter(|block| block.id() != element.id())
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();

    if lines.is_empty() {
        element_text(element)
    } else {
        lines.join("\n")
    }
}

/// Returns the normalized text of the first rule that matches with non-empty text
pub fn match_first(document: &Html, field: &FieldRules) -> Option<String> {
    match_first_with(document, field, element_text)
}

/// [`match_first`] with a custom text reader for the matched element
///
/// Only the first element each rule selects is considered, mirroring a
/// `select_one` lookup; an empty match moves on to the next rule.
pub fn match_first_with<F>(document: &Html, field: &FieldRules, read: F) -> Option<String>
where
    F: Fn(ElementRef<'_>) -> String,
{
    field.rules.iter().find_map(|rule| {
        let element = document.select(&rule.selector).next()?;
        let text = normalize_lines(&read(element), field.max_length);
        if text.is_empty() {
            None
        } else {
            tracing::trace!("Field matched by selector {}", rule.source);
            Some(text)
        }
    })
}
