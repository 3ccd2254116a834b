use async_trait::async_trait;

use super::connection::{DatabaseType, DatabaseUrl};
use super::error::{DriverError, Result};

/// Information returned from a successful ping
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub server_version: Option<String>,
    pub latency_ms: u64,
}

/// Administrative operations every backend implements.
///
/// Implementations hold no state. Each call opens its own connection and
/// closes it before returning, whatever the outcome, so calls for different
/// databases may run concurrently. Nothing is retried and no timeout is
/// added here; use the URL's own options for that.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Create the database named by `url`.
    ///
    /// Not idempotent: if it already exists the backend's error is returned.
    async fn create_database(&self, url: &DatabaseUrl) -> Result<()>;

    /// Drop the database named by `url`. Succeeds when it does not exist.
    async fn drop_database(&self, url: &DatabaseUrl) -> Result<()>;

    /// Whether the database named by `url` exists.
    ///
    /// `Ok(false)` only when the catalog lookup ran and found nothing; any
    /// failure to run it is an error.
    async fn database_exists(&self, url: &DatabaseUrl) -> Result<bool>;

    /// Connect to `url` itself (not the maintenance database) and read the
    /// server version.
    async fn ping(&self, url: &DatabaseUrl) -> Result<ConnectionInfo>;
}

/// Reject URLs meant for another backend before touching the network.
pub(crate) fn ensure_type(url: &DatabaseUrl, expected: DatabaseType) -> Result<()> {
    if url.db_type() != expected {
        return Err(DriverError::InvalidConnectionString(format!(
            "{} driver cannot handle {} URL {}",
            expected.name(),
            url.db_type().name(),
            url
        )));
    }
    Ok(())
}

/// Factory function - creates the right driver for a database type
pub fn create_driver(db_type: DatabaseType) -> Result<Box<dyn DatabaseDriver>> {
    if !db_type.is_available() {
        return Err(DriverError::DriverNotAvailable(db_type.feature_name()));
    }

    match db_type {
        #[cfg(feature = "postgres")]
        DatabaseType::PostgreSQL => Ok(Box::new(super::drivers::postgres::PostgresDriver)),

        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => Ok(Box::new(super::drivers::mysql::MySqlDriver)),

        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => Ok(Box::new(super::drivers::sqlite::SqliteDriver)),

        // Fallback for when feature not compiled
        #[allow(unreachable_patterns)]
        _ => Err(DriverError::DriverNotAvailable(db_type.feature_name())),
    }
}
