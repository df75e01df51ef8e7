use crate::Suggestion;

/// Keep suggestions whose name or category contains `query`, ignoring case.
/// An empty query keeps everything.
pub fn filter_suggestions(suggestions: Vec<Suggestion>, query: &str) -> Vec<Suggestion> {
    if query.is_empty() {
        return suggestions;
    }
    let needle = query.to_lowercase();
    suggestions
        .into_iter()
        .filter(|s| matches_query(s, &needle))
        .collect()
}

/// `needle` must already be lowercase.
pub fn matches_query(suggestion: &Suggestion, needle: &str) -> bool {
    suggestion.name.to_lowercase().contains(needle)
        || suggestion.category.to_lowercase().contains(needle)
}
