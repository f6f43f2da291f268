//! HTTP handlers for the API surface.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use kairo_shared_types::{
    AuthUser, AuthUserResponse, ConnectInitResponse, SyncResponse, TicketListQuery, TicketResponse,
};

use crate::auth;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::gmail::client::GOOGLE_TOKEN_URL;
use crate::gmail::GmailClient;
use crate::models::NewGmailAccount;
use crate::sync::{self, PgStore, UserTokenSink};
use crate::AppState;

const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "kairo-backend",
    }))
}

/// Sync the caller's Gmail inbox into tickets.
///
/// Resolves credentials (live session tokens first, stored row second),
/// builds a one-shot Gmail client for this request, and runs the sync.
pub async fn sync_gmail(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SyncResponse>> {
    let session = auth::authenticate(&headers, &state.config)?;

    let store = Arc::new(PgStore::new(state.pool.clone()));
    let tokens = sync::resolve_credentials(store.as_ref(), &session).await?;

    let sink = Arc::new(UserTokenSink::new(store.clone(), session.user_id));
    let client = GmailClient::new(
        state.http.clone(),
        state.config.google_client_id.clone(),
        state.config.google_client_secret.clone(),
        tokens,
        sink,
    );

    let summary = sync::sync_inbox(
        &client,
        store.as_ref(),
        session.user_id,
        state.config.sync_max_messages,
    )
    .await?;

    Ok(Json(SyncResponse {
        success: true,
        summary,
    }))
}

/// Current authenticated user, with whether a Gmail account is connected.
pub async fn auth_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthUserResponse>> {
    let session = auth::authenticate(&headers, &state.config)?;

    let mut conn = state.pool.get().await?;
    let gmail_connected = db::gmail_accounts::find_by_user(&mut conn, session.user_id)
        .await?
        .is_some();

    Ok(Json(AuthUserResponse {
        user: AuthUser {
            id: session.user_id,
            email: session.email,
            gmail_connected,
        },
    }))
}

/// Start the Gmail connect flow.
///
/// Returns the Google consent URL the frontend should send the user to.
/// The OAuth state parameter carries the user id so the callback knows
/// whose account to store.
pub async fn connect_gmail(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ConnectInitResponse>> {
    let session = auth::authenticate(&headers, &state.config)?;
    let config = &state.config;

    let auth_url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}&\
         access_type=offline&\
         prompt=consent&\
         state={}",
        urlencoding::encode(&config.google_client_id),
        urlencoding::encode(&config.google_redirect_uri),
        urlencoding::encode(GMAIL_READONLY_SCOPE),
        session.user_id
    );

    Ok(Json(ConnectInitResponse { auth_url }))
}

#[derive(Debug, Deserialize)]
pub struct ConnectCallbackParams {
    pub code: String,
    /// The user id planted in the consent URL
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
}

/// Handle the Google OAuth callback for Gmail connect.
///
/// Exchanges the authorization code for tokens and stores them, then sends
/// the user back into the onboarding wizard. Failures redirect with an
/// error query parameter instead of surfacing a JSON error.
pub async fn connect_callback(
    State(state): State<AppState>,
    Query(params): Query<ConnectCallbackParams>,
) -> Response {
    let app_url = state.config.app_url.clone();
    match handle_connect_callback(&state, params).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Gmail connect callback error: {:?}", e);
            Redirect::to(&format!("{}/wizard?connect_error=connect_failed", app_url))
                .into_response()
        }
    }
}

async fn handle_connect_callback(
    state: &AppState,
    params: ConnectCallbackParams,
) -> Result<Response, ApiError> {
    let config = &state.config;

    let user_id = Uuid::parse_str(&params.state).map_err(|_| {
        ApiError::Internal(anyhow::anyhow!(
            "Callback state is not a user id: {}",
            params.state
        ))
    })?;

    // Exchange code for tokens
    #[derive(serde::Serialize)]
    struct TokenRequest {
        code: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        grant_type: String,
    }

    let token_response = state
        .http
        .post(GOOGLE_TOKEN_URL)
        .form(&TokenRequest {
            code: params.code,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            grant_type: "authorization_code".to_string(),
        })
        .send()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Token exchange failed: {}", e)))?;

    if !token_response.status().is_success() {
        let status = token_response.status();
        let body = token_response.text().await.unwrap_or_default();
        tracing::error!("Token exchange failed: {} - {}", status, body);
        return Ok(Redirect::to(&format!(
            "{}/wizard?connect_error=token_exchange_failed",
            config.app_url
        ))
        .into_response());
    }

    let tokens: GoogleTokenResponse = token_response
        .json()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid token response: {}", e)))?;

    // Which mailbox was granted
    let user_info: GoogleUserInfo = state
        .http
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(&tokens.access_token)
        .send()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to get user info: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid user info response: {}", e)))?;

    if tokens.refresh_token.is_none() {
        tracing::warn!(
            "No refresh token received for {}; syncs will need a fresh session once the access token expires",
            user_info.email
        );
    }

    let expires_at = tokens
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs))
        .unwrap_or_else(|| Utc::now() + Duration::hours(1));

    let account = NewGmailAccount {
        user_id,
        email: user_info.email.clone(),
        access_token: Some(tokens.access_token),
        refresh_token: tokens.refresh_token,
        expires_at: Some(expires_at),
    };

    let mut conn = state.pool.get().await?;
    db::gmail_accounts::upsert(&mut conn, &account).await?;

    tracing::info!(
        "Gmail account {} connected for user {}",
        user_info.email,
        user_id
    );

    Ok(Redirect::to(&format!("{}/wizard/complete", config.app_url)).into_response())
}

/// List the caller's tickets, newest first.
pub async fn list_tickets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TicketListQuery>,
) -> ApiResult<Json<Vec<TicketResponse>>> {
    let session = auth::authenticate(&headers, &state.config)?;

    let mut conn = state.pool.get().await?;
    let tickets = db::tickets::list_for_user(
        &mut conn,
        session.user_id,
        query.status.as_deref(),
        query.limit,
        query.offset,
    )
    .await?;

    Ok(Json(
        tickets.into_iter().map(TicketResponse::from).collect(),
    ))
}

/// Fetch one of the caller's tickets by id.
pub async fn get_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
) -> ApiResult<Json<TicketResponse>> {
    let session = auth::authenticate(&headers, &state.config)?;

    let mut conn = state.pool.get().await?;
    let ticket = db::tickets::get_for_user(&mut conn, session.user_id, ticket_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket"))?;

    Ok(Json(TicketResponse::from(ticket)))
}
