//! Gmail REST integration
//!
//! This module provides:
//! - A per-request Gmail API client with transparent token refresh
//! - Normalization of raw API messages into ticket fields

pub mod client;
pub mod normalize;

pub use client::{GmailClient, GmailTokens, ProviderError, RefreshedToken, TokenSink};
pub use normalize::{normalize_message, NormalizedMessage};

/// Gmail API response types. Only the fields the sync pipeline reads are
/// declared; serde skips the rest of each payload.
pub mod api {
    use serde::Deserialize;

    /// Response from listing messages
    #[derive(Debug, Clone, Deserialize)]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
    }

    /// Reference to a message (just the ID; the full record comes later)
    #[derive(Debug, Clone, Deserialize)]
    pub struct MessageRef {
        pub id: String,
    }

    /// Full message from the Gmail API
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: Option<String>,
        pub snippet: Option<String>,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload containing headers and body
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub mime_type: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (base64url encoded when present)
    #[derive(Debug, Clone, Deserialize)]
    pub struct MessageBody {
        pub data: Option<String>,
    }

    /// Message part (for multipart messages)
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub mime_type: Option<String>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }
}
