//! Postgres-backed implementation of the sync storage traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kairo_shared_types::GmailAccount;
use uuid::Uuid;

use super::{CredentialStore, TicketStore};
use crate::db::{self, DbPool};
use crate::models::{NewGmailAccount, NewTicket};

/// Pool-backed store handed to the sync pipeline per request
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn load(&self, user_id: Uuid) -> anyhow::Result<Option<GmailAccount>> {
        let mut conn = self.pool.get().await?;
        db::gmail_accounts::find_by_user(&mut conn, user_id).await
    }

    async fn heal(
        &self,
        user_id: Uuid,
        email: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await?;
        let account = NewGmailAccount {
            user_id,
            email: email.to_string(),
            access_token: Some(access_token.to_string()),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: Some(expires_at),
        };
        db::gmail_accounts::upsert(&mut conn, &account).await?;
        Ok(())
    }

    async fn persist_refreshed(
        &self,
        user_id: Uuid,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await?;
        db::gmail_accounts::update_access_token(&mut conn, user_id, access_token, expires_at).await
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn ticket_exists(&self, user_id: Uuid, gmail_message_id: &str) -> anyhow::Result<bool> {
        let mut conn = self.pool.get().await?;
        db::tickets::exists(&mut conn, user_id, gmail_message_id).await
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> anyhow::Result<bool> {
        let mut conn = self.pool.get().await?;
        let inserted = db::tickets::insert(&mut conn, &ticket).await?;
        Ok(inserted.is_some())
    }
}
