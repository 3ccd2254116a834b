//! Shared helpers for the integration tests.
//!
//! Server-backed suites read a base URL from the environment and skip
//! themselves when it is not set, e.g.
//! `POSTGRES_URL=postgres://postgres@localhost:5432/postgres?sslmode=disable`.

#![allow(dead_code)]

use dbadmin::DatabaseUrl;

/// Install a test subscriber once; `RUST_LOG=dbadmin=debug` shows driver logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Base URL from `var`, or `None` (test skipped) when it is not set.
pub fn base_url(var: &str) -> Option<DatabaseUrl> {
    init_tracing();
    match std::env::var(var) {
        Ok(value) => Some(DatabaseUrl::parse(&value).expect("invalid URL in environment")),
        Err(_) => {
            eprintln!("skipping: {var} is not set");
            None
        }
    }
}

/// Copy of `base` pointing at a database name no other test uses.
pub fn unique_url(base: &DatabaseUrl) -> DatabaseUrl {
    let name = format!("dbadmin_{}", uuid::Uuid::new_v4().simple());
    base.with_database(&name).expect("failed to build test URL")
}

/// `base` with its credentials replaced by an unknown user.
pub fn invalid_user_url(base: &DatabaseUrl) -> DatabaseUrl {
    let mut url = base.as_url().clone();
    url.set_username("invalid").expect("URL cannot carry a username");
    url.set_password(None).expect("URL cannot carry a password");
    DatabaseUrl::from_url(url).expect("failed to build test URL")
}
