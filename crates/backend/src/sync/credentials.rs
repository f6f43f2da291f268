//! Credential resolution for a sync run
//!
//! A live session's provider tokens take precedence over the stored row.
//! When a session carries them they are also written back ("healing"), so
//! later syncs that arrive without provider tokens still work.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{CredentialStore, SyncError};
use crate::auth::AuthSession;
use crate::gmail::{GmailTokens, RefreshedToken, TokenSink};

/// Healed rows get the standard one-hour lifetime; the true expiry of a
/// session-carried token is not visible here.
const HEALED_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Decide which Gmail tokens this sync runs with.
///
/// Healing and stored-row lookups are best-effort on the live-token path; a
/// session that brought its own token must not fail because the database
/// hiccuped.
pub async fn resolve_credentials(
    store: &dyn CredentialStore,
    session: &AuthSession,
) -> Result<GmailTokens, SyncError> {
    if let Some(live_token) = &session.provider_token {
        let stored = match store.load(session.user_id).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Failed to load stored Gmail account: {:?}", e);
                None
            }
        };

        // A refresh token from the session wins; otherwise keep the stored one
        let refresh_token = session
            .provider_refresh_token
            .clone()
            .or_else(|| stored.and_then(|row| row.refresh_token));

        let expires_at = Utc::now() + Duration::seconds(HEALED_TOKEN_LIFETIME_SECS);
        if let Err(e) = store
            .heal(
                session.user_id,
                &session.email,
                live_token,
                refresh_token.as_deref(),
                expires_at,
            )
            .await
        {
            tracing::warn!("Failed to store session Gmail tokens: {:?}", e);
        }

        return Ok(GmailTokens {
            access_token: Some(live_token.clone()),
            refresh_token,
        });
    }

    // No live token, so the stored row is the only source
    let account = store
        .load(session.user_id)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to load stored Gmail account: {:?}", e);
            SyncError::NotConnected
        })?
        .ok_or(SyncError::NotConnected)?;

    let tokens = GmailTokens {
        access_token: account.access_token,
        refresh_token: account.refresh_token,
    };

    // A row holding only a refresh token is still usable; one with neither is not
    if tokens.access_token.is_none() && tokens.refresh_token.is_none() {
        return Err(SyncError::NotConnected);
    }

    Ok(tokens)
}

/// Writes tokens minted during a sync back to the credential store
pub struct UserTokenSink {
    store: Arc<dyn CredentialStore>,
    user_id: Uuid,
}

impl UserTokenSink {
    pub fn new(store: Arc<dyn CredentialStore>, user_id: Uuid) -> Self {
        Self { store, user_id }
    }
}

#[async_trait]
impl TokenSink for UserTokenSink {
    async fn on_token_refreshed(&self, token: &RefreshedToken) -> anyhow::Result<()> {
        self.store
            .persist_refreshed(self.user_id, &token.access_token, token.expires_at)
            .await
    }
}
