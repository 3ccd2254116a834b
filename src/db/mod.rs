pub mod classify;
pub mod connection;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod registry;
pub mod resolver;

pub use connection::{DatabaseType, DatabaseUrl};
pub use driver::{create_driver, ConnectionInfo, DatabaseDriver};
pub use error::{DriverError, ErrorKind, Result};
pub use registry::DriverRegistry;
