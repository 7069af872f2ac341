//! Audio-language narrowing of a source list
//!
//! Matching is a substring test of the language keywords against the
//! uppercased `label` and `lang` of each source, so ambiguous labels such
//! as `VIDCLOUD-SUB` match several languages. Filtering never empties a
//! list: when nothing matches, the input comes back unchanged.

use crate::models::{Language, StreamSource};

pub fn matches_language(source: &StreamSource, language: Language) -> bool {
    let label = source.label.to_uppercase();
    let lang = source.lang.as_deref().unwrap_or_default().to_uppercase();

    language
        .keywords()
        .iter()
        .any(|keyword| label.contains(keyword) || lang.contains(keyword))
}

/// Keep the sources carrying `language`, or all of them if none do
pub fn filter_by_language(sources: Vec<StreamSource>, language: Language) -> Vec<StreamSource> {
    if language.is_default() {
        return sources;
    }

    let matching: Vec<StreamSource> = sources
        .iter()
        .filter(|s| matches_language(s, language))
        .cloned()
        .collect();

    if matching.is_empty() {
        sources
    } else {
        matching
    }
}
