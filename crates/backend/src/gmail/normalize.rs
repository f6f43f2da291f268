//! Gmail message normalization
//!
//! Flattens a raw Gmail API message into the fields a ticket needs: parsed
//! sender, subject fallback, received timestamp, and the plain/HTML bodies
//! gathered from the MIME part tree.

use base64::prelude::*;
use chrono::{DateTime, Utc};

use super::api::{GmailMessage, Header, MessagePart, MessagePayload};

/// Hard ceiling on MIME nesting; real mail rarely exceeds a handful of
/// levels, and a hostile tree must not recurse unbounded.
const MAX_PART_DEPTH: usize = 32;

/// Subject used when a message has none
const NO_SUBJECT: &str = "(No Subject)";

/// A Gmail message flattened into ticket fields
#[derive(Debug, Clone)]
pub struct NormalizedMessage {
    pub gmail_message_id: String,
    pub gmail_thread_id: Option<String>,
    pub subject: String,
    pub from_email: String,
    pub from_name: Option<String>,
    pub to_email: Option<String>,
    pub received_at: DateTime<Utc>,
    /// True when the Date header was missing or unparsable and
    /// `received_at` fell back to the time of the sync
    pub date_fallback: bool,
    pub body_plain: Option<String>,
    pub body_html: Option<String>,
    pub snippet: Option<String>,
}

/// Normalize a raw Gmail message. Never fails: a message with no payload
/// still yields a row with the subject fallback and the sync time.
pub fn normalize_message(message: &GmailMessage) -> NormalizedMessage {
    let headers = message
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_deref())
        .unwrap_or(&[]);

    let subject = extract_header(headers, "Subject")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NO_SUBJECT.to_string());

    let (from_email, from_name) = extract_header(headers, "From")
        .map(|value| parse_from_header(&value))
        .unwrap_or_else(|| (String::new(), None));

    let to_email = extract_header(headers, "To").filter(|s| !s.is_empty());

    let parsed_date = extract_header(headers, "Date").and_then(|value| parse_date(&value));
    let date_fallback = parsed_date.is_none();
    let received_at = parsed_date.unwrap_or_else(Utc::now);

    let (body_plain, body_html) = message
        .payload
        .as_ref()
        .map(collect_bodies)
        .unwrap_or_default()
        .into_fields();

    NormalizedMessage {
        gmail_message_id: message.id.clone(),
        gmail_thread_id: message.thread_id.clone().filter(|s| !s.is_empty()),
        subject,
        from_email,
        from_name,
        to_email,
        received_at,
        date_fallback,
        body_plain,
        body_html,
        snippet: message.snippet.clone().filter(|s| !s.is_empty()),
    }
}

/// Find a header value by name, case-insensitively
fn extract_header(headers: &[Header], name: &str) -> Option<String> {
    headers.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Split a From header into address and optional display name.
/// Handles `Display Name <addr@host>` and bare `addr@host` forms.
fn parse_from_header(value: &str) -> (String, Option<String>) {
    match value.rfind('<') {
        Some(start) if value.trim_end().ends_with('>') => {
            let trimmed = value.trim_end();
            let email = trimmed[start + 1..trimmed.len() - 1].trim().to_string();
            let name = value[..start].trim().trim_matches('"').trim().to_string();
            let name = if name.is_empty() { None } else { Some(name) };
            (email, name)
        }
        _ => (value.trim().to_string(), None),
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Bodies accumulated across the MIME tree, in document order
#[derive(Debug, Default)]
struct MessageBodies {
    plain: String,
    html: String,
}

impl MessageBodies {
    fn into_fields(self) -> (Option<String>, Option<String>) {
        (none_if_empty(self.plain), none_if_empty(self.html))
    }
}

fn none_if_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn collect_bodies(payload: &MessagePayload) -> MessageBodies {
    let mut bodies = MessageBodies::default();

    if let Some(parts) = &payload.parts {
        for part in parts {
            collect_part(part, &mut bodies, 0);
        }
    } else if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_ref()) {
        // Single-part message: the payload itself is the body
        if let Some(text) = decode_base64_body(data) {
            if payload.mime_type.as_deref() == Some("text/plain") {
                bodies.plain = text;
            } else {
                bodies.html = text;
            }
        }
    }

    bodies
}

fn collect_part(part: &MessagePart, bodies: &mut MessageBodies, depth: usize) {
    if depth >= MAX_PART_DEPTH {
        tracing::warn!(
            "Ignoring MIME parts nested deeper than {} levels",
            MAX_PART_DEPTH
        );
        return;
    }

    let data = part.body.as_ref().and_then(|b| b.data.as_ref());

    if part.mime_type.as_deref() == Some("text/plain") && data.is_some() {
        if let Some(text) = data.and_then(|d| decode_base64_body(d)) {
            bodies.plain.push_str(&text);
        }
    } else if part.mime_type.as_deref() == Some("text/html") && data.is_some() {
        if let Some(text) = data.and_then(|d| decode_base64_body(d)) {
            bodies.html.push_str(&text);
        }
    } else if let Some(nested) = &part.parts {
        for child in nested {
            collect_part(child, bodies, depth + 1);
        }
    }
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding varies in the wild, so several
/// decoders are tried in turn.
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] = &[
        &BASE64_URL_SAFE_NO_PAD,
        &URL_SAFE,
        &STANDARD,
        &STANDARD_NO_PAD,
    ];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            if let Ok(text) = String::from_utf8(decoded) {
                return Some(text);
            }
        }
    }

    None
}
