//! PostgreSQL driver implementation

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_postgres::config::SslMode;
use tokio_postgres::{Client, Config, NoTls};

use crate::db::classify::{classify, NativeError, Rule};
use crate::db::connection::{DatabaseType, DatabaseUrl};
use crate::db::driver::{ensure_type, ConnectionInfo, DatabaseDriver};
use crate::db::error::{DriverError, ErrorKind, Result};
use crate::db::resolver::{maintenance_url, target_database};

/// Classification table, checked top to bottom.
pub const RULES: &[Rule] = &[
    // invalid_catalog_name
    Rule::code("3D000", ErrorKind::TargetAbsent),
    Rule::message("database \"", "\" does not exist", ErrorKind::TargetAbsent),
    // invalid_authorization_specification, invalid_password
    Rule::code("28000", ErrorKind::CredentialRejected),
    Rule::code("28P01", ErrorKind::CredentialRejected),
    Rule::message("role \"", "\" does not exist", ErrorKind::CredentialRejected),
    Rule::message(
        "password authentication failed for user \"",
        "\"",
        ErrorKind::CredentialRejected,
    ),
    // connection_exception class, cannot_connect_now, too_many_connections
    Rule::class("08", ErrorKind::ConnectionUnavailable),
    Rule::code("57P03", ErrorKind::ConnectionUnavailable),
    Rule::code("53300", ErrorKind::ConnectionUnavailable),
    Rule::message("error connecting to server", "", ErrorKind::ConnectionUnavailable),
    Rule::message("error performing TLS handshake", "", ErrorKind::ConnectionUnavailable),
    Rule::message("error communicating with the server", "", ErrorKind::ConnectionUnavailable),
    Rule::message("connection closed", "", ErrorKind::ConnectionUnavailable),
];

pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce a tokio-postgres error to what the rule table matches on.
///
/// Server errors keep only the server's message, without the severity
/// prefix tokio-postgres adds when displaying them.
fn native_error(e: &tokio_postgres::Error) -> NativeError {
    if let Some(db) = e.as_db_error() {
        return NativeError::new(Some(db.code().code().to_string()), db.message());
    }

    if e.is_closed() || has_io_source(e) {
        NativeError::transport(e.to_string())
    } else {
        NativeError::new(e.code().map(|c| c.code().to_string()), e.to_string())
    }
}

fn has_io_source(e: &tokio_postgres::Error) -> bool {
    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        if err.downcast_ref::<std::io::Error>().is_some() {
            return true;
        }
        source = err.source();
    }
    false
}

pub fn classify_error(e: tokio_postgres::Error) -> DriverError {
    let err = classify(RULES, native_error(&e));
    tracing::debug!(kind = ?err.kind(), error = %e, "PostgreSQL error");
    err
}

/// Quote `name` as an SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn spawn_connection<S, T>(connection: tokio_postgres::Connection<S, T>) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    // Required by tokio-postgres; finishes once the client is dropped.
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(error = %e, "PostgreSQL connection error");
        }
    })
}

/// Open a dedicated connection. The returned task drives it and ends once
/// the client is dropped.
async fn connect(url: &DatabaseUrl) -> Result<(Client, JoinHandle<()>)> {
    let config: Config = url
        .as_str()
        .parse()
        .map_err(|e: tokio_postgres::Error| DriverError::InvalidConnectionString(e.to_string()))?;

    tracing::debug!(db = %url, "connecting to PostgreSQL");

    match config.get_ssl_mode() {
        SslMode::Disable => {
            let (client, connection) = config.connect(NoTls).await.map_err(classify_error)?;
            Ok((client, spawn_connection(connection)))
        }
        _ => {
            let connector = TlsConnector::new()
                .map_err(|e| DriverError::ConnectionUnavailable(e.to_string()))?;
            let (client, connection) = config
                .connect(MakeTlsConnector::new(connector))
                .await
                .map_err(classify_error)?;
            Ok((client, spawn_connection(connection)))
        }
    }
}

/// Run `op` over a dedicated connection to `url`, then close it and wait
/// until the connection task has finished.
async fn with_connection<T, F>(url: &DatabaseUrl, op: F) -> Result<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c Client) -> BoxFuture<'c, Result<T>> + Send,
{
    let (client, connection) = connect(url).await?;

    let result = op(&client).await;

    drop(client);
    if let Err(e) = connection.await {
        tracing::warn!(db = %url, error = %e, "PostgreSQL connection task failed");
    }

    result
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    async fn create_database(&self, url: &DatabaseUrl) -> Result<()> {
        ensure_type(url, DatabaseType::PostgreSQL)?;
        let name = target_database(url)?;

        let statement = format!("CREATE DATABASE {}", quote_identifier(&name));
        tracing::debug!(database = %name, "{statement}");
        with_connection(&maintenance_url(url), move |client| {
            async move { client.batch_execute(&statement).await.map_err(classify_error) }.boxed()
        })
        .await?;

        tracing::info!(database = %name, "created PostgreSQL database");
        Ok(())
    }

    async fn drop_database(&self, url: &DatabaseUrl) -> Result<()> {
        ensure_type(url, DatabaseType::PostgreSQL)?;
        let name = target_database(url)?;

        let statement = format!("DROP DATABASE IF EXISTS {}", quote_identifier(&name));
        tracing::debug!(database = %name, "{statement}");
        with_connection(&maintenance_url(url), move |client| {
            async move { client.batch_execute(&statement).await.map_err(classify_error) }.boxed()
        })
        .await?;

        tracing::info!(database = %name, "dropped PostgreSQL database");
        Ok(())
    }

    async fn database_exists(&self, url: &DatabaseUrl) -> Result<bool> {
        ensure_type(url, DatabaseType::PostgreSQL)?;
        let name = target_database(url)?;

        let row = with_connection(&maintenance_url(url), move |client| {
            async move {
                client
                    .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&name])
                    .await
                    .map_err(classify_error)
            }
            .boxed()
        })
        .await?;

        Ok(row.is_some())
    }

    async fn ping(&self, url: &DatabaseUrl) -> Result<ConnectionInfo> {
        ensure_type(url, DatabaseType::PostgreSQL)?;
        let start = Instant::now();

        let version = with_connection(url, |client| {
            async move {
                let row = client
                    .query_one("SELECT version()", &[])
                    .await
                    .map_err(classify_error)?;
                Ok::<String, DriverError>(row.get(0))
            }
            .boxed()
        })
        .await?;

        let latency = start.elapsed().as_millis() as u64;

        Ok(ConnectionInfo {
            server_version: Some(version),
            latency_ms: latency,
        })
    }
}
