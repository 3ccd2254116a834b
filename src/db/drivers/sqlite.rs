//! SQLite driver implementation
//!
//! A SQLite database is a file, so there is no server and no maintenance
//! database: creating opens a new file, dropping removes it and the
//! existence check looks at the filesystem.

use async_trait::async_trait;
use rusqlite::{Connection as SqliteConnection, OpenFlags};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::db::classify::{classify, NativeError, Rule};
use crate::db::connection::{DatabaseType, DatabaseUrl};
use crate::db::driver::{ensure_type, ConnectionInfo, DatabaseDriver};
use crate::db::error::{DriverError, ErrorKind, Result};
use crate::db::resolver::target_database;

/// Classification table. Engine errors use the primary result code, I/O
/// errors the `std::io::ErrorKind` name.
pub const RULES: &[Rule] = &[
    // SQLITE_CANTOPEN
    Rule::code("14", ErrorKind::TargetAbsent),
    Rule::message("unable to open database file", "", ErrorKind::TargetAbsent),
    Rule::code("NotFound", ErrorKind::TargetAbsent),
    // SQLITE_PERM, SQLITE_AUTH
    Rule::code("3", ErrorKind::CredentialRejected),
    Rule::code("23", ErrorKind::CredentialRejected),
    Rule::code("PermissionDenied", ErrorKind::CredentialRejected),
    // SQLITE_BUSY, SQLITE_LOCKED
    Rule::code("5", ErrorKind::ConnectionUnavailable),
    Rule::code("6", ErrorKind::ConnectionUnavailable),
];

/// Files SQLite may leave next to the database.
const SIDECAR_SUFFIXES: &[&str] = &["-journal", "-wal", "-shm"];

pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn native_error(e: &rusqlite::Error) -> NativeError {
    match e {
        rusqlite::Error::SqliteFailure(failure, message) => NativeError::new(
            Some((failure.extended_code & 0xff).to_string()),
            message.clone().unwrap_or_else(|| failure.to_string()),
        ),
        _ => NativeError::new(None, e.to_string()),
    }
}

pub fn classify_error(e: rusqlite::Error) -> DriverError {
    let err = classify(RULES, native_error(&e));
    tracing::debug!(kind = ?err.kind(), error = %e, "SQLite error");
    err
}

pub fn classify_io_error(path: &Path, e: io::Error) -> DriverError {
    let native = NativeError::new(
        Some(format!("{:?}", e.kind())),
        format!("{}: {}", path.display(), e),
    );
    classify(RULES, native)
}

/// Database file named by `url`.
fn database_path(url: &DatabaseUrl) -> Result<PathBuf> {
    ensure_type(url, DatabaseType::SQLite)?;
    Ok(PathBuf::from(target_database(url)?))
}

/// Create and ping need the directory to exist. Drop and exists treat a
/// missing directory as a missing database instead.
fn require_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            Err(DriverError::InvalidConnectionString(format!(
                "Parent directory does not exist: {}",
                parent.display()
            )))
        }
        _ => Ok(()),
    }
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(classify_io_error(path, e)),
    }
}

/// Remove a file left behind by a create that failed half way.
fn discard_partial(path: &Path) {
    if let Err(cleanup) = std::fs::remove_file(path) {
        tracing::warn!(
            database = %path.display(),
            error = %cleanup,
            "failed to remove partially created SQLite database"
        );
    }
}

/// SQLite is synchronous, so every operation runs in a blocking task
async fn blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| DriverError::Unclassified(e.to_string()))?
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn create_database(&self, url: &DatabaseUrl) -> Result<()> {
        let path = database_path(url)?;

        blocking(move || {
            require_parent(&path)?;

            // create_new makes a second create fail instead of reusing the file
            std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => DriverError::Unclassified(format!(
                        "database \"{}\" already exists",
                        path.display()
                    )),
                    _ => classify_io_error(&path, e),
                })?;

            let initialized = SqliteConnection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_WRITE,
            )
            .and_then(|conn| conn.execute_batch("PRAGMA user_version = 0;"));

            if let Err(e) = initialized {
                discard_partial(&path);
                return Err(classify_error(e));
            }

            tracing::info!(database = %path.display(), "created SQLite database");
            Ok(())
        })
        .await
    }

    async fn drop_database(&self, url: &DatabaseUrl) -> Result<()> {
        let path = database_path(url)?;

        blocking(move || {
            let removed = remove_if_present(&path)?;
            for suffix in SIDECAR_SUFFIXES {
                remove_if_present(&sidecar_path(&path, suffix))?;
            }

            if removed {
                tracing::info!(database = %path.display(), "dropped SQLite database");
            }
            Ok(())
        })
        .await
    }

    async fn database_exists(&self, url: &DatabaseUrl) -> Result<bool> {
        let path = database_path(url)?;

        blocking(move || match std::fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(classify_io_error(&path, e)),
        })
        .await
    }

    async fn ping(&self, url: &DatabaseUrl) -> Result<ConnectionInfo> {
        let path = database_path(url)?;
        let start = Instant::now();

        let version = blocking(move || {
            require_parent(&path)?;

            // no SQLITE_OPEN_CREATE: a missing file is an error, not a new database
            let conn = SqliteConnection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_WRITE)
                .map_err(classify_error)?;

            let version: String = conn
                .query_row("SELECT sqlite_version()", [], |row| row.get(0))
                .map_err(classify_error)?;

            Ok(version)
        })
        .await?;

        let latency = start.elapsed().as_millis() as u64;

        Ok(ConnectionInfo {
            server_version: Some(format!("SQLite {}", version)),
            latency_ms: latency,
        })
    }
}
