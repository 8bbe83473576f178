//! SurrealDB connection setup
//!
//! Resolves where run state lives and opens a namespaced connection:
//! - cloud / remote endpoint with credentials (`StoreConfig::from_env`)
//! - plain `SURREALDB_URL`
//! - local on-disk `surrealkv://.estimate/db`
//! - in-memory (`mem://`) for tests

use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

use crate::error::StateError;
use crate::migrations;
use crate::Result;

const DEFAULT_NAMESPACE: &str = "estimate";
const DEFAULT_DATABASE: &str = "main";
const LOCAL_DB_PATH: &str = ".estimate/db";

/// How the connection authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignIn {
    /// Root user, scoped to no namespace.
    Root,
    /// Database user, scoped to `namespace`/`database`.
    Database,
}

/// A remote SurrealDB endpoint holding run state.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
    pub sign_in: SignIn,
}

impl StoreConfig {
    /// `SURREALDB_ENDPOINT`, `SURREALDB_USERNAME` and `SURREALDB_PASSWORD`
    /// are required; `SURREALDB_NAMESPACE`, `SURREALDB_DATABASE` and
    /// `SURREALDB_ROOT` are optional. `None` when any required key is unset.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let sign_in = match lookup("SURREALDB_ROOT") {
            Some(v) if v.eq_ignore_ascii_case("true") => SignIn::Root,
            _ => SignIn::Database,
        };
        Some(Self {
            endpoint: lookup("SURREALDB_ENDPOINT")?,
            username: lookup("SURREALDB_USERNAME")?,
            password: lookup("SURREALDB_PASSWORD")?,
            namespace: lookup("SURREALDB_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            database: lookup("SURREALDB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            sign_in,
        })
    }
}

/// Open an in-memory database with the schema applied.
#[instrument]
pub async fn connect_in_memory() -> Result<Surreal<Any>> {
    open_url("mem://").await
}

/// Open an authenticated connection described by `config`.
#[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
pub async fn connect_with(config: &StoreConfig) -> Result<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(&config.endpoint)
        .await
        .map_err(|e| {
            StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
        })?;

    let signed_in = match config.sign_in {
        SignIn::Root => {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
        }
        SignIn::Database => {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
        }
    };
    signed_in.map_err(|e| {
        StateError::Connection(format!(
            "{:?} sign-in to {} failed: {e}",
            config.sign_in, config.endpoint
        ))
    })?;

    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| StateError::Connection(e.to_string()))?;

    migrations::init_schema(&db).await?;
    info!(sign_in = ?config.sign_in, "Connected to SurrealDB");
    Ok(db)
}

/// Resolve a connection from the environment.
///
/// Order: `StoreConfig::from_env`, then `SURREALDB_URL`, then local
/// persistence under `.estimate/db`.
pub async fn connect_from_env() -> Result<Surreal<Any>> {
    if let Some(config) = StoreConfig::from_env() {
        return connect_with(&config).await;
    }

    if let Ok(url) = std::env::var("SURREALDB_URL") {
        return open_url(&url).await;
    }

    std::fs::create_dir_all(LOCAL_DB_PATH).map_err(|e| {
        StateError::Connection(format!(
            "Failed to create database directory {}: {}",
            LOCAL_DB_PATH, e
        ))
    })?;
    let url = format!("surrealkv://{}", LOCAL_DB_PATH);
    info!(
        "No cloud config or SURREALDB_URL found, using local persistence: {}",
        url
    );
    open_url(&url).await
}

async fn open_url(url: &str) -> Result<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(url)
        .await
        .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

    db.use_ns(DEFAULT_NAMESPACE)
        .use_db(DEFAULT_DATABASE)
        .await
        .map_err(|e| StateError::Connection(e.to_string()))?;

    migrations::init_schema(&db).await?;
    info!("Connected to SurrealDB ({})", url);
    Ok(db)
}
