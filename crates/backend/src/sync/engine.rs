//! The sync run itself: list, dedup, fetch, normalize, insert.
//!
//! One bad message never aborts a run. Failures on a single message are
//! logged and reflected in the counts; only a failed listing (or resolving
//! no credentials at all) surfaces as an error.

use kairo_shared_types::{SyncSummary, TicketStatus};
use uuid::Uuid;

use super::{MailProvider, SyncError, TicketStore};
use crate::gmail::{normalize_message, NormalizedMessage};
use crate::models::NewTicket;

const INBOX_FOLDER: &str = "inbox";
const EMPTY_INBOX_MESSAGE: &str = "No emails found in inbox";

/// Sync the user's inbox into tickets.
///
/// Every listed message counts toward `processed`, whether it was created,
/// skipped as a duplicate, or dropped by a per-message failure.
pub async fn sync_inbox(
    provider: &dyn MailProvider,
    tickets: &dyn TicketStore,
    user_id: Uuid,
    max_messages: u32,
) -> Result<SyncSummary, SyncError> {
    let refs = provider.list_folder(INBOX_FOLDER, max_messages).await?;

    if refs.is_empty() {
        tracing::info!("No inbox messages for user {}", user_id);
        return Ok(SyncSummary {
            message: Some(EMPTY_INBOX_MESSAGE.to_string()),
            ..Default::default()
        });
    }

    let mut summary = SyncSummary {
        total: refs.len() as u32,
        ..Default::default()
    };

    for message_ref in &refs {
        summary.processed += 1;

        // Dedup check first so already-synced messages cost no fetch
        match tickets.ticket_exists(user_id, &message_ref.id).await {
            Ok(true) => {
                summary.skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    "Skipping message {}: dedup check failed: {:?}",
                    message_ref.id,
                    e
                );
                continue;
            }
        }

        let message = match provider.fetch_message(&message_ref.id).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Skipping message {}: fetch failed: {:?}", message_ref.id, e);
                continue;
            }
        };

        let normalized = normalize_message(&message);
        if normalized.date_fallback {
            tracing::warn!(
                "Message {} has no parsable Date header, stamped with sync time",
                message_ref.id
            );
        }

        match tickets.insert_ticket(new_ticket(user_id, normalized)).await {
            Ok(true) => summary.created += 1,
            Ok(false) => {
                // A concurrent writer got there first; counts as neither
                // created nor skipped
                tracing::debug!("Message {} already had a ticket on insert", message_ref.id);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to insert ticket for message {}: {:?}",
                    message_ref.id,
                    e
                );
            }
        }
    }

    tracing::info!(
        "Sync for user {} finished: {} created, {} skipped, {} listed",
        user_id,
        summary.created,
        summary.skipped,
        summary.total
    );

    Ok(summary)
}

fn new_ticket(user_id: Uuid, message: NormalizedMessage) -> NewTicket {
    NewTicket {
        user_id,
        gmail_message_id: message.gmail_message_id,
        gmail_thread_id: message.gmail_thread_id,
        subject: message.subject,
        from_email: message.from_email,
        from_name: message.from_name,
        to_email: message.to_email,
        received_at: message.received_at,
        body_plain: message.body_plain,
        body_html: message.body_html,
        snippet: message.snippet,
        status: TicketStatus::Open.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{plain_message, FakeMailProvider, InMemoryTicketStore};

    #[tokio::test]
    async fn creates_tickets_for_new_messages() {
        let user_id = Uuid::new_v4();
        let provider = FakeMailProvider::with_messages(vec![
            plain_message("m1", "First"),
            plain_message("m2", "Second"),
            plain_message("m3", "Third"),
        ]);
        let store = InMemoryTicketStore::default();

        let summary = sync_inbox(&provider, &store, user_id, 100).await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.created, 3);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.total, 3);
        assert!(summary.message.is_none());
        assert_eq!(store.count(), 3);

        let ticket = store.get(user_id, "m2").unwrap();
        assert_eq!(ticket.subject, "Second");
        assert_eq!(ticket.from_email, "ada@example.com");
        assert_eq!(ticket.from_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(ticket.status, "open");
        assert_eq!(ticket.body_plain.as_deref(), Some("body of m2"));
        assert_eq!(ticket.gmail_thread_id.as_deref(), Some("thread-m2"));
    }

    #[tokio::test]
    async fn second_run_skips_everything_without_fetching() {
        let user_id = Uuid::new_v4();
        let provider = FakeMailProvider::with_messages(vec![
            plain_message("m1", "First"),
            plain_message("m2", "Second"),
        ]);
        let store = InMemoryTicketStore::default();

        sync_inbox(&provider, &store, user_id, 100).await.unwrap();
        let summary = sync_inbox(&provider, &store, user_id, 100).await.unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.total, 2);
        assert_eq!(store.count(), 2);

        // Only the first run fetched full messages
        assert_eq!(provider.fetched_ids().len(), 2);
    }

    #[tokio::test]
    async fn dedup_is_scoped_per_user() {
        let other_user = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let provider = FakeMailProvider::with_messages(vec![plain_message("m1", "First")]);
        let store = InMemoryTicketStore::default();
        store.seed(other_user, "m1");

        let summary = sync_inbox(&provider, &store, user_id, 100).await.unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 0);
        assert!(store.get(user_id, "m1").is_some());
    }

    #[tokio::test]
    async fn empty_inbox_reports_a_message() {
        let provider = FakeMailProvider::default();
        let store = InMemoryTicketStore::default();

        let summary = sync_inbox(&provider, &store, Uuid::new_v4(), 100)
            .await
            .unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.message.as_deref(), Some("No emails found in inbox"));
    }

    #[tokio::test]
    async fn listing_failure_aborts_the_run() {
        let provider = FakeMailProvider {
            fail_list: true,
            ..Default::default()
        };
        let store = InMemoryTicketStore::default();

        let result = sync_inbox(&provider, &store, Uuid::new_v4(), 100).await;
        assert!(matches!(result, Err(SyncError::Provider(_))));
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_drops_one_message_not_the_run() {
        let user_id = Uuid::new_v4();
        let provider = FakeMailProvider {
            messages: vec![
                plain_message("m1", "First"),
                plain_message("m2", "Second"),
                plain_message("m3", "Third"),
                plain_message("m4", "Fourth"),
                plain_message("m5", "Fifth"),
            ],
            fail_fetch_for: vec!["m3".to_string()],
            ..Default::default()
        };
        let store = InMemoryTicketStore::default();

        let summary = sync_inbox(&provider, &store, user_id, 100).await.unwrap();

        assert_eq!(summary.processed, 5);
        assert_eq!(summary.created, 4);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.total, 5);
        assert!(store.get(user_id, "m3").is_none());
    }

    #[tokio::test]
    async fn dedup_check_failure_drops_the_message_without_fetching() {
        let user_id = Uuid::new_v4();
        let provider = FakeMailProvider::with_messages(vec![
            plain_message("m1", "First"),
            plain_message("m2", "Second"),
            plain_message("m3", "Third"),
        ]);
        let store = InMemoryTicketStore {
            fail_exists_for: vec!["m2".to_string()],
            ..Default::default()
        };

        let summary = sync_inbox(&provider, &store, user_id, 100).await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.skipped, 0);
        assert!(!provider.fetched_ids().contains(&"m2".to_string()));
    }

    #[tokio::test]
    async fn insert_failure_drops_one_message_not_the_run() {
        let user_id = Uuid::new_v4();
        let provider = FakeMailProvider::with_messages(vec![
            plain_message("m1", "First"),
            plain_message("m2", "Second"),
        ]);
        let store = InMemoryTicketStore {
            fail_insert_for: vec!["m1".to_string()],
            ..Default::default()
        };

        let summary = sync_inbox(&provider, &store, user_id, 100).await.unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn insert_race_counts_as_neither_created_nor_skipped() {
        let user_id = Uuid::new_v4();
        let provider = FakeMailProvider::with_messages(vec![plain_message("m1", "First")]);
        let store = InMemoryTicketStore {
            // Simulate a concurrent writer: the dedup check misses, then the
            // insert finds the row already present
            lie_not_exists_for: vec!["m1".to_string()],
            ..Default::default()
        };
        store.seed(user_id, "m1");

        let summary = sync_inbox(&provider, &store, user_id, 100).await.unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.total, 1);
    }

    #[tokio::test]
    async fn listing_honors_max_messages() {
        let user_id = Uuid::new_v4();
        let provider = FakeMailProvider::with_messages(vec![
            plain_message("m1", "First"),
            plain_message("m2", "Second"),
            plain_message("m3", "Third"),
            plain_message("m4", "Fourth"),
            plain_message("m5", "Fifth"),
        ]);
        let store = InMemoryTicketStore::default();

        let summary = sync_inbox(&provider, &store, user_id, 3).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.created, 3);
    }
}
