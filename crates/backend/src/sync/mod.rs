//! Inbox sync pipeline
//!
//! Pulls recent messages for one user, skips the ones a ticket already
//! exists for, and inserts the rest. The Gmail API and Postgres sit behind
//! traits so the engine and credential logic run against in-memory fakes
//! in tests.

pub mod credentials;
pub mod engine;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use credentials::{resolve_credentials, UserTokenSink};
pub use engine::sync_inbox;
pub use store::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kairo_shared_types::GmailAccount;
use uuid::Uuid;

use crate::gmail::api::{GmailMessage, MessageRef};
use crate::gmail::ProviderError;
use crate::models::NewTicket;

/// Why a sync run failed outright. Per-message failures are tolerated and
/// only shape the summary counts, and a credential row that cannot be read
/// resolves to `NotConnected`.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no Gmail account is connected for this user")]
    NotConnected,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Read-side mailbox access
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// List message references in a folder, newest first
    async fn list_folder(
        &self,
        folder: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>, ProviderError>;

    /// Fetch one full message by ID
    async fn fetch_message(&self, id: &str) -> Result<GmailMessage, ProviderError>;
}

/// Stored Gmail credentials, one row per user
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self, user_id: Uuid) -> anyhow::Result<Option<GmailAccount>>;

    /// Upsert credentials observed on a live session, so later syncs can run
    /// without one
    async fn heal(
        &self,
        user_id: Uuid,
        email: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Persist an access token minted mid-sync
    async fn persist_refreshed(
        &self,
        user_id: Uuid,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Ticket rows keyed by (user, gmail message)
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn ticket_exists(&self, user_id: Uuid, gmail_message_id: &str) -> anyhow::Result<bool>;

    /// Insert a ticket. Returns false when a row for the same message
    /// already won the race.
    async fn insert_ticket(&self, ticket: NewTicket) -> anyhow::Result<bool>;
}
