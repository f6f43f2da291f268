use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket struct matching database column order exactly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub gmail_message_id: String,
    pub gmail_thread_id: Option<String>,
    pub subject: String,
    pub from_email: String,
    pub from_name: Option<String>,
    pub to_email: Option<String>,
    pub received_at: DateTime<Utc>,
    pub body_plain: Option<String>,
    pub body_html: Option<String>,
    pub snippet: Option<String>,
    pub status: String, // stored as VARCHAR: "open", "resolved", "archived"
    pub ticket_type: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub sentiment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Resolved,
    Archived,
}

impl TicketStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Archived => "archived",
        }
    }
}

/// Connected Gmail account matching database column order exactly.
/// Token columns are nullable: a row can outlive its tokens (revocation,
/// partial writes) and still mark the account as connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct GmailAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// API Request/Response types
// ============================================================================

/// Tallies for one inbox sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub processed: u32,
    pub created: u32,
    pub skipped: u32,
    pub total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response body for a completed sync request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    pub summary: SyncSummary,
}

/// API response for tickets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub gmail_message_id: String,
    pub gmail_thread_id: Option<String>,
    pub subject: String,
    pub from_email: String,
    pub from_name: Option<String>,
    pub to_email: Option<String>,
    pub received_at: DateTime<Utc>,
    pub body_plain: Option<String>,
    pub body_html: Option<String>,
    pub snippet: Option<String>,
    pub status: String,
    pub ticket_type: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub sentiment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        TicketResponse {
            id: ticket.id,
            gmail_message_id: ticket.gmail_message_id,
            gmail_thread_id: ticket.gmail_thread_id,
            subject: ticket.subject,
            from_email: ticket.from_email,
            from_name: ticket.from_name,
            to_email: ticket.to_email,
            received_at: ticket.received_at,
            body_plain: ticket.body_plain,
            body_html: ticket.body_html,
            snippet: ticket.snippet,
            status: ticket.status,
            ticket_type: ticket.ticket_type,
            priority: ticket.priority,
            category: ticket.category,
            sentiment: ticket.sentiment,
            created_at: ticket.created_at,
        }
    }
}

/// Query parameters for listing tickets
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TicketListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Authenticated user as reported by `/api/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub gmail_connected: bool,
}

/// Response envelope for `/api/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUserResponse {
    pub user: AuthUser,
}

/// Response for starting the Gmail OAuth connect flow.
/// The frontend redirects the user to this URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectInitResponse {
    pub auth_url: String,
}
