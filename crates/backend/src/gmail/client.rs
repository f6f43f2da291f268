//! Gmail API HTTP client
//!
//! A short-lived client built per request from whatever credentials the
//! caller resolved. Refreshes the access token on demand and reports every
//! refresh to a [`TokenSink`] so new tokens outlive the request.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::api::{GmailMessage, ListMessagesResponse, MessageRef};
use crate::sync::MailProvider;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google omits `expires_in` on rare occasions; access tokens last an hour.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Gmail interactions that can fail
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Gmail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gmail API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("no refresh token available to renew Gmail access")]
    MissingRefreshToken,
    #[error("token refresh failed with status {status}: {body}")]
    TokenRefresh { status: u16, body: String },
}

/// Credentials the client starts from. Either token may be absent; a client
/// with only a refresh token mints an access token on first use.
#[derive(Debug, Clone, Default)]
pub struct GmailTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// A freshly minted access token, reported to the [`TokenSink`]
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Receives every token refresh so the caller can persist it. The client
/// awaits the sink before continuing; a sink failure is logged but does not
/// fail the Gmail call that triggered the refresh.
#[async_trait]
pub trait TokenSink: Send + Sync {
    async fn on_token_refreshed(&self, token: &RefreshedToken) -> anyhow::Result<()>;
}

/// Body of a Google token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Gmail API client for one user's mailbox
pub struct GmailClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    tokens: Mutex<GmailTokens>,
    sink: Arc<dyn TokenSink>,
}

impl GmailClient {
    pub fn new(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        tokens: GmailTokens,
        sink: Arc<dyn TokenSink>,
    ) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            tokens: Mutex::new(tokens),
            sink,
        }
    }

    /// Current access token, minting one from the refresh token if needed
    async fn access_token(&self) -> Result<String, ProviderError> {
        let current = {
            let tokens = self.tokens.lock().unwrap();
            tokens.access_token.clone()
        };

        match current {
            Some(token) => Ok(token),
            None => self.refresh_access_token().await,
        }
    }

    /// Exchange the refresh token for a new access token, store it, and
    /// report it to the sink
    async fn refresh_access_token(&self) -> Result<String, ProviderError> {
        let refresh_token = {
            let tokens = self.tokens.lock().unwrap();
            tokens.refresh_token.clone()
        };
        let refresh_token = refresh_token.ok_or(ProviderError::MissingRefreshToken)?;

        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::TokenRefresh {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(self.apply_token_response(token).await)
    }

    /// Store a token endpoint response and report it to the sink.
    ///
    /// A response without `expires_in` gets the standard one-hour lifetime,
    /// and one without a refresh token keeps the current one. The sink is
    /// awaited, but a sink failure only logs: the refreshed token is still
    /// good for this run.
    async fn apply_token_response(&self, token: TokenResponse) -> String {
        let expires_at =
            Utc::now() + Duration::seconds(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));

        {
            let mut tokens = self.tokens.lock().unwrap();
            tokens.access_token = Some(token.access_token.clone());
            // Preserve the refresh token if Google did not return a new one
            if token.refresh_token.is_some() {
                tokens.refresh_token = token.refresh_token;
            }
        }

        let refreshed = RefreshedToken {
            access_token: token.access_token.clone(),
            expires_at,
        };
        if let Err(e) = self.sink.on_token_refreshed(&refreshed).await {
            tracing::error!("Failed to persist refreshed Gmail token: {:?}", e);
        }

        token.access_token
    }

    /// GET a Gmail endpoint, refreshing the token once on a 401
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let token = self.access_token().await?;
        let response = self.http.get(url).bearer_auth(&token).send().await?;

        let response = if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            let token = self.refresh_access_token().await?;
            self.http.get(url).bearer_auth(&token).send().await?
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

fn build_list_url(folder: &str, max_results: u32) -> String {
    let query = urlencoding::encode(&format!("in:{}", folder)).into_owned();
    format!(
        "{}/users/me/messages?maxResults={}&q={}",
        GMAIL_API_BASE,
        max_results.clamp(1, 500),
        query
    )
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_folder(
        &self,
        folder: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>, ProviderError> {
        let url = build_list_url(folder, max_results);
        let list: ListMessagesResponse = self.get_json(&url).await?;
        Ok(list.messages.unwrap_or_default())
    }

    async fn fetch_message(&self, id: &str) -> Result<GmailMessage, ProviderError> {
        let url = format!("{}/users/me/messages/{}?format=full", GMAIL_API_BASE, id);
        self.get_json(&url).await
    }
}
