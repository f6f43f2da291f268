use anyhow::{Context, Result};
use std::env;

/// Runtime configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub cookie_name: String,
    pub sync_max_messages: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID must be set")?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .context("GOOGLE_CLIENT_SECRET must be set")?,
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .context("GOOGLE_REDIRECT_URI must be set")?,
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            cookie_name: env::var("AUTH_COOKIE_NAME")
                .unwrap_or_else(|_| "kairo_session".to_string()),
            sync_max_messages: env::var("SYNC_MAX_MESSAGES")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("SYNC_MAX_MESSAGES must be a valid number")?,
        })
    }
}
