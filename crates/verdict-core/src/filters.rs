//! Post-extraction cleanup for case page paragraphs.
//!
//! Both filters compare items by their normalized text (lowercased,
//! whitespace collapsed), drop anything of 20 characters or fewer, and keep
//! only the first occurrence of each normalized text. The case-text filter
//! additionally drops site navigation fragments.

use std::collections::HashSet;

use crate::models::ExtractedElement;

/// Normalized texts at or below this length are discarded.
pub const MIN_TEXT_LEN: usize = 20;

/// Fragments that mark navigation chrome rather than case text.
pub const NAVIGATION_MARKERS: [&str; 3] = ["next page", "previous page", "google"];

/// Lowercase and collapse runs of whitespace into single spaces.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_navigation(normalized: &str) -> bool {
    NAVIGATION_MARKERS
        .iter()
        .any(|marker| normalized.contains(marker))
}

fn dedup_filter(
    items: &[ExtractedElement],
    drop: impl Fn(&str) -> bool,
) -> Vec<ExtractedElement> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| {
            let normalized = normalize_text(&item.text);
            if normalized.chars().count() <= MIN_TEXT_LEN || drop(&normalized) {
                return false;
            }
            seen.insert(normalized)
        })
        .cloned()
        .collect()
}

/// Deduplicate case text, dropping short and navigation paragraphs.
pub fn filter_case_text(items: &[ExtractedElement]) -> Vec<ExtractedElement> {
    dedup_filter(items, is_navigation)
}

/// Deduplicate opinion paragraphs, dropping short fragments.
pub fn filter_opinions(items: &[ExtractedElement]) -> Vec<ExtractedElement> {
    dedup_filter(items, |_| false)
}
