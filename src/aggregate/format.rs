use serde_json::Value;

/// Field names camera summaries shorten, matched case-insensitively
const CAMERA_ABBREVIATIONS: &[(&str, &str)] = &[
    ("continuous mode", "CM"),
    ("last picture", "LP"),
    ("version", "V"),
    ("heartbeat", "H"),
    ("last update", "H"),
];

/// "last_update" -> "Last update"
pub fn humanize_key(key: &str) -> String {
    capitalize(&key.replace('_', " "))
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render a field value for chat output.
///
/// Nested mappings are flattened to `key: value, key: value`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", humanize_key(k), display_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub fn abbreviate_camera_field(key: &str) -> String {
    let normalized = key.replace('_', " ").to_lowercase();
    CAMERA_ABBREVIATIONS
        .iter()
        .find(|(long, _)| *long == normalized)
        .map(|(_, short)| short.to_string())
        .unwrap_or_else(|| humanize_key(key))
}

/// `active` of "1" (string or number) means active, anything else inactive
pub fn active_label(value: &Value) -> &'static str {
    let active = match value {
        Value::String(s) => s.trim() == "1",
        Value::Number(n) => n.as_u64() == Some(1),
        Value::Bool(b) => *b,
        _ => false,
    };
    if active {
        "Active"
    } else {
        "Inactive"
    }
}

pub fn is_active_field(key: &str) -> bool {
    key.eq_ignore_ascii_case("active")
}
