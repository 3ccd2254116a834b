use std::collections::HashMap;
use std::sync::Arc;

use super::connection::{DatabaseType, DatabaseUrl};
use super::driver::{create_driver, DatabaseDriver};
use super::error::{DriverError, Result};

/// Maps URL schemes to drivers.
///
/// Built once at startup and then only read, so lookups need no locking and
/// the registry can be shared freely between tasks.
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Registry holding every driver compiled into this build.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for db_type in DatabaseType::all() {
            if let Ok(driver) = create_driver(*db_type) {
                registry.register(Arc::from(driver));
            }
        }
        registry
    }

    /// Register `driver` under every scheme of its database type.
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        for scheme in driver.database_type().schemes() {
            self.register_scheme(scheme, driver.clone());
        }
    }

    /// Register `driver` under one extra scheme.
    pub fn register_scheme(&mut self, scheme: &str, driver: Arc<dyn DatabaseDriver>) {
        tracing::debug!(scheme, driver = %driver.database_type(), "registered driver");
        self.drivers.insert(scheme.to_ascii_lowercase(), driver);
    }

    pub fn get(&self, scheme: &str) -> Result<Arc<dyn DatabaseDriver>> {
        if let Some(driver) = self.drivers.get(&scheme.to_ascii_lowercase()) {
            return Ok(driver.clone());
        }

        match DatabaseType::from_scheme(scheme) {
            Some(db_type) if !db_type.is_available() => {
                Err(DriverError::DriverNotAvailable(db_type.feature_name()))
            }
            _ => Err(DriverError::UnsupportedScheme(scheme.to_string())),
        }
    }

    /// Driver for the backend `url` points at.
    pub fn for_url(&self, url: &DatabaseUrl) -> Result<Arc<dyn DatabaseDriver>> {
        self.get(url.scheme())
    }

    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.drivers.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
