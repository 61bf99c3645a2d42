use std::num::NonZeroUsize;

/// First image URL of a record, or an empty string.
///
/// Some upstream records carry the whole list JSON-encoded inside the first
/// element (`["https://..."]`); the first URL of that list is used instead.
pub fn primary_image(images: &[String]) -> String {
    let first = match images.first() {
        Some(first) => first.as_str(),
        None => return String::new(),
    };
    if first.starts_with("[\"") {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(first) {
            return list.into_iter().next().unwrap_or_default();
        }
    }
    first.to_string()
}

pub fn parse_page_size(value: &str) -> Result<NonZeroUsize, String> {
    let raw = value.trim();
    let n: usize = raw
        .parse()
        .map_err(|_| format!("invalid page size '{raw}'"))?;
    NonZeroUsize::new(n).ok_or_else(|| "page size must be a positive integer".to_string())
}

pub fn parse_page_number(value: &str) -> Result<usize, String> {
    let raw = value.trim();
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("invalid page '{raw}', expected a positive integer")),
    }
}

pub fn parse_product_id(value: &str) -> Result<i64, String> {
    let raw = value.trim().trim_start_matches('#');
    raw.parse::<i64>()
        .map_err(|_| format!("invalid product id '{}'", value.trim()))
}

// cut to `max` chars, marking the cut with an ellipsis
pub fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

// strips one pair of surrounding double quotes
pub fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(trimmed)
}
