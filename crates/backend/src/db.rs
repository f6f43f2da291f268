use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};
use kairo_shared_types::{GmailAccount, Ticket};
use uuid::Uuid;

use crate::models::{NewGmailAccount, NewTicket};

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration; hosted Postgres requires TLS
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    // Parse the connection string and connect with TLS
    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    // Build the async connection from the tokio-postgres client
    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup =
        Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url,
        manager_config,
    );
    let pool = Pool::builder(config).build()?;

    Ok(pool)
}

// Gmail account database operations
pub mod gmail_accounts {
    use super::*;

    pub async fn find_by_user(
        conn: &mut AsyncPgConnection,
        user: Uuid,
    ) -> anyhow::Result<Option<GmailAccount>> {
        use crate::schema::gmail_accounts::dsl::*;

        let account = gmail_accounts
            .filter(user_id.eq(user))
            .first::<GmailAccount>(conn)
            .await
            .optional()?;

        Ok(account)
    }

    /// Insert or replace the credential row for a user.
    /// One row per user; a fresh sign-in supersedes older tokens in place.
    pub async fn upsert(
        conn: &mut AsyncPgConnection,
        account: &NewGmailAccount,
    ) -> anyhow::Result<GmailAccount> {
        use crate::schema::gmail_accounts::dsl::*;

        let row = diesel::insert_into(gmail_accounts)
            .values(account)
            .on_conflict(user_id)
            .do_update()
            .set((
                email.eq(&account.email),
                access_token.eq(&account.access_token),
                refresh_token.eq(&account.refresh_token),
                expires_at.eq(account.expires_at),
                updated_at.eq(Utc::now()),
            ))
            .get_result::<GmailAccount>(conn)
            .await?;

        Ok(row)
    }

    pub async fn update_access_token(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        token: &str,
        token_expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        use crate::schema::gmail_accounts::dsl::*;

        diesel::update(gmail_accounts.filter(user_id.eq(user)))
            .set((
                access_token.eq(Some(token)),
                expires_at.eq(Some(token_expires_at)),
                updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }
}

// Ticket database operations
pub mod tickets {
    use super::*;

    pub async fn exists(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        message_id: &str,
    ) -> anyhow::Result<bool> {
        use crate::schema::tickets::dsl::*;

        let count: i64 = tickets
            .filter(user_id.eq(user))
            .filter(gmail_message_id.eq(message_id))
            .count()
            .get_result(conn)
            .await?;

        Ok(count > 0)
    }

    /// Insert a ticket, relying on the (user_id, gmail_message_id) unique
    /// index as the dedup backstop. Returns None when the row already exists.
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        ticket: &NewTicket,
    ) -> anyhow::Result<Option<Ticket>> {
        use crate::schema::tickets::dsl::*;

        let row = diesel::insert_into(tickets)
            .values(ticket)
            .on_conflict((user_id, gmail_message_id))
            .do_nothing()
            .get_result::<Ticket>(conn)
            .await
            .optional()?;

        Ok(row)
    }

    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        status_filter: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> anyhow::Result<Vec<Ticket>> {
        use crate::schema::tickets::dsl::*;

        let mut query = tickets
            .filter(user_id.eq(user))
            .order_by(received_at.desc())
            .into_boxed();

        if let Some(s) = status_filter {
            query = query.filter(status.eq(s.to_string()));
        }
        if let Some(l) = limit {
            query = query.limit(l);
        }
        if let Some(o) = offset {
            query = query.offset(o);
        }

        let items = query.load::<Ticket>(conn).await?;
        Ok(items)
    }

    pub async fn get_for_user(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        ticket_id: Uuid,
    ) -> anyhow::Result<Option<Ticket>> {
        use crate::schema::tickets::dsl::*;

        let ticket = tickets
            .filter(id.eq(ticket_id))
            .filter(user_id.eq(user))
            .first::<Ticket>(conn)
            .await
            .optional()?;

        Ok(ticket)
    }
}
