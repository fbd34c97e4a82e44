use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Renders an instant the way it appears in the archive document
pub fn display_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(DISPLAY_FORMAT).to_string()
}

/// Parses a timestamp string and renders it in the archive display format
/// Supports various formats: ISO 8601 with or without offset, plain datetime
pub fn format_timestamp_display(timestamp_str: &str) -> String {
    let trimmed = timestamp_str.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    // ISO 8601 with timezone (e.g., "2025-12-16T10:30:00Z" or "2025-12-16T10:30:00.123+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return display_timestamp(&dt.with_timezone(&Utc));
    }

    // ISO 8601 without timezone (assume UTC)
    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return display_timestamp(&naive_dt.and_utc());
    }

    // Space separated datetime (e.g., "2025-12-16 10:30:00")
    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return display_timestamp(&naive_dt.and_utc());
    }

    // If parsing fails, return the original string
    trimmed.to_string()
}

/// Sanitizes a string for use in a filename
/// Replaces invalid filename characters with underscores
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Deterministic output document name for a server and archive instant
pub fn output_filename(server_name: &str, archived_at: &DateTime<Utc>) -> String {
    let stamp = archived_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("server_messages_{}_{}.pdf", sanitize_filename(server_name), stamp)
}

/// Normalize credentials passed by users.
/// - Trims whitespace
/// - Strips surrounding ASCII or unicode quotes (" ' “ ” ‘ ’)
pub fn normalize_token(raw: &str) -> String {
    let mut s = raw.trim().to_string();

    fn is_quote_char(c: char) -> bool {
        matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’')
    }

    while s.starts_with(is_quote_char) && s.len() > 1 {
        s.remove(0);
    }
    while s.ends_with(is_quote_char) && s.len() > 1 {
        s.pop();
    }

    s.trim().to_string()
}

/// Replaces characters the document fonts cannot draw
pub fn printable_text(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect()
}
