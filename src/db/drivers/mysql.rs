//! MySQL driver implementation

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts};
use std::time::Instant;

use crate::db::classify::{classify, NativeError, Rule};
use crate::db::connection::{DatabaseType, DatabaseUrl};
use crate::db::driver::{ensure_type, ConnectionInfo, DatabaseDriver};
use crate::db::error::{DriverError, ErrorKind, Result};
use crate::db::resolver::{maintenance_url, target_database};

/// Classification table, checked top to bottom. Codes are server error
/// numbers.
pub const RULES: &[Rule] = &[
    // ER_BAD_DB_ERROR, ER_DB_DROP_EXISTS
    Rule::code("1049", ErrorKind::TargetAbsent),
    Rule::code("1008", ErrorKind::TargetAbsent),
    Rule::message("Unknown database '", "'", ErrorKind::TargetAbsent),
    // ER_DBACCESS_DENIED_ERROR, ER_ACCESS_DENIED_ERROR, ER_ACCESS_DENIED_NO_PASSWORD_ERROR
    Rule::code("1044", ErrorKind::CredentialRejected),
    Rule::code("1045", ErrorKind::CredentialRejected),
    Rule::code("1698", ErrorKind::CredentialRejected),
    Rule::message("Access denied for user ", "", ErrorKind::CredentialRejected),
    // ER_CON_COUNT_ERROR, ER_BAD_HOST_ERROR, ER_HANDSHAKE_ERROR,
    // ER_HOST_IS_BLOCKED, ER_HOST_NOT_PRIVILEGED
    Rule::code("1040", ErrorKind::ConnectionUnavailable),
    Rule::code("1042", ErrorKind::ConnectionUnavailable),
    Rule::code("1043", ErrorKind::ConnectionUnavailable),
    Rule::code("1129", ErrorKind::ConnectionUnavailable),
    Rule::code("1130", ErrorKind::ConnectionUnavailable),
    // client-side CR_* codes
    Rule::code("2002", ErrorKind::ConnectionUnavailable),
    Rule::code("2003", ErrorKind::ConnectionUnavailable),
    Rule::code("2006", ErrorKind::ConnectionUnavailable),
    Rule::code("2013", ErrorKind::ConnectionUnavailable),
    Rule::message("Connection to the server is closed", "", ErrorKind::ConnectionUnavailable),
];

pub struct MySqlDriver;

impl MySqlDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn native_error(e: &mysql_async::Error) -> NativeError {
    match e {
        mysql_async::Error::Server(server) => {
            NativeError::new(Some(server.code.to_string()), server.message.clone())
        }
        mysql_async::Error::Io(_) => NativeError::transport(e.to_string()),
        _ => NativeError::new(None, e.to_string()),
    }
}

pub fn classify_error(e: mysql_async::Error) -> DriverError {
    let err = classify(RULES, native_error(&e));
    tracing::debug!(kind = ?err.kind(), error = %e, "MySQL error");
    err
}

/// Quote `name` as a MySQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Run `op` over a dedicated connection to `url`, then disconnect whether or
/// not it succeeded.
async fn with_connection<T, F>(url: &DatabaseUrl, op: F) -> Result<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut Conn) -> BoxFuture<'c, Result<T>> + Send,
{
    let opts = Opts::from_url(url.as_str())
        .map_err(|e| DriverError::InvalidConnectionString(e.to_string()))?;

    tracing::debug!(db = %url, "connecting to MySQL");
    let mut conn = Conn::new(opts).await.map_err(classify_error)?;

    let result = op(&mut conn).await;

    if let Err(e) = conn.disconnect().await {
        tracing::warn!(error = %e, "MySQL disconnect failed");
    }

    result
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    async fn create_database(&self, url: &DatabaseUrl) -> Result<()> {
        ensure_type(url, DatabaseType::MySQL)?;
        let name = target_database(url)?;

        let statement = format!("CREATE DATABASE {}", quote_identifier(&name));
        tracing::debug!(database = %name, "{statement}");
        with_connection(&maintenance_url(url), move |conn| {
            async move { conn.query_drop(statement).await.map_err(classify_error) }.boxed()
        })
        .await?;

        tracing::info!(database = %name, "created MySQL database");
        Ok(())
    }

    async fn drop_database(&self, url: &DatabaseUrl) -> Result<()> {
        ensure_type(url, DatabaseType::MySQL)?;
        let name = target_database(url)?;

        let statement = format!("DROP DATABASE IF EXISTS {}", quote_identifier(&name));
        tracing::debug!(database = %name, "{statement}");
        with_connection(&maintenance_url(url), move |conn| {
            async move { conn.query_drop(statement).await.map_err(classify_error) }.boxed()
        })
        .await?;

        tracing::info!(database = %name, "dropped MySQL database");
        Ok(())
    }

    async fn database_exists(&self, url: &DatabaseUrl) -> Result<bool> {
        ensure_type(url, DatabaseType::MySQL)?;
        let name = target_database(url)?;

        let row = with_connection(&maintenance_url(url), move |conn| {
            async move {
                let row: Option<i64> = conn
                    .exec_first(
                        "SELECT 1 FROM information_schema.schemata WHERE schema_name = ?",
                        (name,),
                    )
                    .await
                    .map_err(classify_error)?;
                Ok::<_, DriverError>(row)
            }
            .boxed()
        })
        .await?;

        Ok(row.is_some())
    }

    async fn ping(&self, url: &DatabaseUrl) -> Result<ConnectionInfo> {
        ensure_type(url, DatabaseType::MySQL)?;
        let start = Instant::now();

        let version = with_connection(url, |conn| {
            async move {
                let version: Option<String> = conn
                    .query_first("SELECT VERSION()")
                    .await
                    .map_err(classify_error)?;
                Ok::<_, DriverError>(version)
            }
            .boxed()
        })
        .await?;

        let latency = start.elapsed().as_millis() as u64;

        Ok(ConnectionInfo {
            server_version: version.map(|v| format!("MySQL {}", v)),
            latency_ms: latency,
        })
    }
}
