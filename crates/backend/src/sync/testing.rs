//! In-memory fakes for exercising the sync pipeline without Postgres or
//! the Gmail API.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::bail;
use async_trait::async_trait;
use base64::prelude::*;
use chrono::{DateTime, Utc};
use kairo_shared_types::GmailAccount;
use uuid::Uuid;

use super::{CredentialStore, MailProvider, TicketStore};
use crate::gmail::api::{GmailMessage, Header, MessageBody, MessagePayload, MessageRef};
use crate::gmail::ProviderError;
use crate::models::NewTicket;

pub(crate) fn account_row(
    user_id: Uuid,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
) -> GmailAccount {
    GmailAccount {
        id: Uuid::new_v4(),
        user_id,
        email: "user@example.com".to_string(),
        access_token: access_token.map(str::to_string),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: Some(Utc::now()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A single-part text/plain message with ordinary headers
pub(crate) fn plain_message(id: &str, subject: &str) -> GmailMessage {
    GmailMessage {
        id: id.to_string(),
        thread_id: Some(format!("thread-{}", id)),
        snippet: Some(format!("snippet of {}", id)),
        payload: Some(MessagePayload {
            mime_type: Some("text/plain".to_string()),
            headers: Some(vec![
                Header {
                    name: "From".to_string(),
                    value: "Ada Lovelace <ada@example.com>".to_string(),
                },
                Header {
                    name: "To".to_string(),
                    value: "support@kairo.app".to_string(),
                },
                Header {
                    name: "Subject".to_string(),
                    value: subject.to_string(),
                },
                Header {
                    name: "Date".to_string(),
                    value: "Tue, 15 Jul 2025 10:30:00 +0000".to_string(),
                },
            ]),
            body: Some(MessageBody {
                data: Some(BASE64_URL_SAFE_NO_PAD.encode(format!("body of {}", id))),
            }),
            parts: None,
        }),
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCredentialStore {
    pub accounts: RwLock<HashMap<Uuid, GmailAccount>>,
    pub fail_load: bool,
    pub fail_heal: bool,
}

impl InMemoryCredentialStore {
    pub fn put(&self, row: GmailAccount) {
        self.accounts.write().unwrap().insert(row.user_id, row);
    }

    pub fn get(&self, user_id: Uuid) -> Option<GmailAccount> {
        self.accounts.read().unwrap().get(&user_id).cloned()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, user_id: Uuid) -> anyhow::Result<Option<GmailAccount>> {
        if self.fail_load {
            bail!("injected load failure");
        }
        Ok(self.get(user_id))
    }

    async fn heal(
        &self,
        user_id: Uuid,
        email: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if self.fail_heal {
            bail!("injected heal failure");
        }

        let mut accounts = self.accounts.write().unwrap();
        let row = accounts.entry(user_id).or_insert_with(|| GmailAccount {
            id: Uuid::new_v4(),
            user_id,
            email: email.to_string(),
            access_token: None,
            refresh_token: None,
            expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        row.email = email.to_string();
        row.access_token = Some(access_token.to_string());
        row.refresh_token = refresh_token.map(str::to_string);
        row.expires_at = Some(expires_at);
        row.updated_at = Utc::now();

        Ok(())
    }

    async fn persist_refreshed(
        &self,
        user_id: Uuid,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut accounts = self.accounts.write().unwrap();
        if let Some(row) = accounts.get_mut(&user_id) {
            row.access_token = Some(access_token.to_string());
            row.expires_at = Some(expires_at);
            row.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryTicketStore {
    pub tickets: RwLock<HashMap<(Uuid, String), NewTicket>>,
    pub fail_exists_for: Vec<String>,
    pub fail_insert_for: Vec<String>,
    /// Message IDs the dedup check pretends not to know, to simulate a
    /// concurrent writer landing between the check and the insert
    pub lie_not_exists_for: Vec<String>,
}

impl InMemoryTicketStore {
    /// Pre-seed a ticket so the message counts as already synced
    pub fn seed(&self, user_id: Uuid, gmail_message_id: &str) {
        let ticket = NewTicket {
            user_id,
            gmail_message_id: gmail_message_id.to_string(),
            gmail_thread_id: None,
            subject: "seeded".to_string(),
            from_email: "seed@example.com".to_string(),
            from_name: None,
            to_email: None,
            received_at: Utc::now(),
            body_plain: None,
            body_html: None,
            snippet: None,
            status: "open".to_string(),
        };
        self.tickets
            .write()
            .unwrap()
            .insert((user_id, gmail_message_id.to_string()), ticket);
    }

    pub fn count(&self) -> usize {
        self.tickets.read().unwrap().len()
    }

    pub fn get(&self, user_id: Uuid, gmail_message_id: &str) -> Option<NewTicket> {
        self.tickets
            .read()
            .unwrap()
            .get(&(user_id, gmail_message_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn ticket_exists(&self, user_id: Uuid, gmail_message_id: &str) -> anyhow::Result<bool> {
        if self.fail_exists_for.iter().any(|id| id == gmail_message_id) {
            bail!("injected exists-check failure");
        }
        if self
            .lie_not_exists_for
            .iter()
            .any(|id| id == gmail_message_id)
        {
            return Ok(false);
        }
        Ok(self
            .tickets
            .read()
            .unwrap()
            .contains_key(&(user_id, gmail_message_id.to_string())))
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> anyhow::Result<bool> {
        if self
            .fail_insert_for
            .iter()
            .any(|id| id == &ticket.gmail_message_id)
        {
            bail!("injected insert failure");
        }

        let mut tickets = self.tickets.write().unwrap();
        let key = (ticket.user_id, ticket.gmail_message_id.clone());
        if tickets.contains_key(&key) {
            return Ok(false);
        }
        tickets.insert(key, ticket);
        Ok(true)
    }
}

#[derive(Default)]
pub(crate) struct FakeMailProvider {
    pub messages: Vec<GmailMessage>,
    pub fail_list: bool,
    pub fail_fetch_for: Vec<String>,
    pub fetch_calls: RwLock<Vec<String>>,
}

impl FakeMailProvider {
    pub fn with_messages(messages: Vec<GmailMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn fetched_ids(&self) -> Vec<String> {
        self.fetch_calls.read().unwrap().clone()
    }
}

#[async_trait]
impl MailProvider for FakeMailProvider {
    async fn list_folder(
        &self,
        _folder: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>, ProviderError> {
        if self.fail_list {
            return Err(ProviderError::Api {
                status: 500,
                body: "injected list failure".to_string(),
            });
        }
        Ok(self
            .messages
            .iter()
            .take(max_results as usize)
            .map(|m| MessageRef { id: m.id.clone() })
            .collect())
    }

    async fn fetch_message(&self, id: &str) -> Result<GmailMessage, ProviderError> {
        self.fetch_calls.write().unwrap().push(id.to_string());

        if self.fail_fetch_for.iter().any(|failed| failed == id) {
            return Err(ProviderError::Api {
                status: 500,
                body: "injected fetch failure".to_string(),
            });
        }
        self.messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(ProviderError::Api {
                status: 404,
                body: "no such message".to_string(),
            })
    }
}
