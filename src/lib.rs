//! Create, drop and check for databases across SQL backends.
//!
//! Pick a driver from a [`DriverRegistry`] by the URL's scheme, then call
//! one of the [`DatabaseDriver`] operations with the URL of the database to
//! administer:
//!
//! ```no_run
//! use dbadmin::{DatabaseUrl, DriverRegistry};
//!
//! # async fn run() -> dbadmin::Result<()> {
//! let registry = DriverRegistry::with_defaults();
//! let url = DatabaseUrl::parse("postgres://postgres@localhost:5432/app?sslmode=disable")?;
//! let driver = registry.for_url(&url)?;
//!
//! driver.drop_database(&url).await?;
//! driver.create_database(&url).await?;
//! assert!(driver.database_exists(&url).await?);
//! # Ok(())
//! # }
//! ```
//!
//! Server backends run their statements over a connection to a maintenance
//! database (see [`db::resolver`]). Failures come back as [`DriverError`],
//! whose [`ErrorKind`] separates a missing database from rejected
//! credentials or an unreachable server.

pub mod db;

pub use db::{
    create_driver, ConnectionInfo, DatabaseDriver, DatabaseType, DatabaseUrl, DriverError,
    DriverRegistry, ErrorKind, Result,
};
