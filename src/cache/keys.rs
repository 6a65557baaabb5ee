pub const CATALOG_TAG: &str = "catalog";

pub fn user_tag(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// Free-form text is length-prefixed so no category or user id can spell out
/// another key.
fn segment(value: &str) -> String {
    format!("{}:{}", value.len(), value)
}

pub fn categories_key() -> &'static str {
    "catalog:categories"
}

pub fn sections_key(category: &str) -> String {
    format!("catalog:sections:{}", segment(category))
}

pub fn words_key(category: &str, section: Option<i64>) -> String {
    match section {
        Some(section) => format!("catalog:words:{}:{}", segment(category), section),
        None => format!("catalog:words:{}", segment(category)),
    }
}

pub fn all_words_key() -> &'static str {
    "catalog:words:*all"
}

pub fn word_key(word_id: i64) -> String {
    format!("catalog:word:{}", word_id)
}

pub fn progress_key(user_id: &str, category: Option<&str>) -> String {
    match category {
        Some(category) => format!("user:{}:progress:{}", segment(user_id), segment(category)),
        None => format!("user:{}:progress", segment(user_id)),
    }
}

pub fn favorites_key(user_id: &str) -> String {
    format!("user:{}:favorites", segment(user_id))
}

pub fn review_key(user_id: &str) -> String {
    format!("user:{}:review", segment(user_id))
}

pub fn statistics_key(user_id: &str) -> String {
    format!("user:{}:statistics", segment(user_id))
}
