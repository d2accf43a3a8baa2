use log::debug;
use serde_json::Value;

use super::candidate::CandidateTable;

/// Identifiers named in a model's answer, in order and without duplicates.
///
/// A JSON object with a `tools` array is preferred; anything else is read as
/// a comma or newline separated list. Entries that name no candidate are
/// dropped.
pub fn parse_selection(response: &str, table: &CandidateTable) -> Vec<String> {
    let keys = structured_keys(response).unwrap_or_else(|| {
        debug!("Selection reply is not structured, reading it as a list");
        list_keys(response)
    });

    let mut selected: Vec<String> = Vec::new();
    for key in keys {
        match table.lookup(&key) {
            Some(pack_id) => {
                if !selected.iter().any(|s| s == pack_id) {
                    selected.push(pack_id.to_string());
                }
            }
            None => debug!("Ignoring unknown tool {:?}", key),
        }
    }
    selected
}

fn structured_keys(response: &str) -> Option<Vec<String>> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    let value: Value = serde_json::from_str(&response[start..=end]).ok()?;
    let tools = value.get("tools")?.as_array()?;

    Some(
        tools
            .iter()
            .filter_map(|entry| match entry {
                Value::Object(map) => map.get("tool_id").or_else(|| map.get("id")).and_then(key_of),
                other => key_of(other),
            })
            .collect(),
    )
}

fn key_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn list_keys(response: &str) -> Vec<String> {
    split_top_level(response)
        .into_iter()
        .filter_map(|item| clean_item(&item))
        .collect()
}

/// Split on commas and newlines outside parentheses.
fn split_top_level(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' | '\n' if depth == 0 => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);
    items
}

fn clean_item(item: &str) -> Option<String> {
    let mut item = item.trim();
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = item.strip_prefix(bullet) {
            item = rest.trim_start();
        }
    }
    let item = strip_list_number(item);
    let item = item.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '[' | ']'));
    let item = match item.find('(') {
        Some(open) => &item[..open],
        None => item,
    };
    let item = item
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.'));

    (!item.is_empty()).then(|| item.to_string())
}

/// Drop a `1. ` or `2) ` marker. A bare number is left alone.
fn strip_list_number(item: &str) -> &str {
    let digits = item.len() - item.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return item;
    }
    let rest = &item[digits..];
    match rest.strip_prefix(['.', ')']) {
        Some(after) if after.starts_with(char::is_whitespace) => after.trim_start(),
        _ => item,
    }
}
