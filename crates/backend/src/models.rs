// Database models for Diesel
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Insertable struct for tickets created from synced mail.
/// Triage columns (type, priority, category, sentiment) are filled in later
/// by the categorization pipeline and stay NULL at insert time.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = crate::schema::tickets)]
pub struct NewTicket {
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
    pub status: String,
}

/// Insertable struct for connected Gmail accounts
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::gmail_accounts)]
pub struct NewGmailAccount {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
