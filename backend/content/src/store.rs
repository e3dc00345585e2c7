//! # SQLite
//!
//! Single file relational store for projects, devlogs and admin users.
//!
//! ## Requirements
//!
//! - Schema owned by the embedded migrations in `migrations/`
//! - Migrations are idempotent, running them twice is a no-op
//! - Foreign keys enforced, deleting a project unlinks its devlogs
//!
//! ## Implementation
//!
//! - One `SqlitePool`, file created on first connect
//! - Multi-row writes (bulk delete, clearing sample data) run in one transaction
use std::str::FromStr;

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

use crate::{auth::DEFAULT_ITERATIONS, error::StoreError, models::Counts, slug};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
    pub(crate) password_iterations: u32,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        info!("Connected to {database_url}");

        Ok(Self {
            pool,
            password_iterations: DEFAULT_ITERATIONS,
        })
    }

    /// Private in-memory database, already migrated.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            password_iterations: DEFAULT_ITERATIONS,
        };
        store.migrate().await?;

        Ok(store)
    }

    /// PBKDF2 work factor for admins created through this handle.
    pub fn with_password_iterations(mut self, iterations: u32) -> Self {
        self.password_iterations = iterations;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies pending migrations, returning how many ran.
    pub async fn migrate(&self) -> Result<usize, StoreError> {
        let before = self.applied_migrations().await?;
        MIGRATOR.run(&self.pool).await?;
        let after = self.applied_migrations().await?;

        let applied = after.saturating_sub(before);
        if applied == 0 {
            info!("No migrations to apply");
        } else {
            info!("Applied {applied} migration(s)");
        }

        Ok(applied)
    }

    async fn applied_migrations(&self) -> Result<usize, StoreError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
        )
        .fetch_one(&self.pool)
        .await?;

        if exists == 0 {
            return Ok(0);
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }

    pub async fn counts(&self) -> Result<Counts, StoreError> {
        let (projects, featured_projects): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_featured), 0) FROM projects",
        )
        .fetch_one(&self.pool)
        .await?;

        let (devlogs, published_devlogs): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_published), 0) FROM devlogs",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Counts {
            projects,
            featured_projects,
            devlogs,
            published_devlogs,
        })
    }

    /// Removes every devlog and project, admins are kept.
    pub async fn clear_content(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM devlogs").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM projects").execute(&mut *tx).await?;

        tx.commit().await?;
        info!("Cleared all projects and devlogs");

        Ok(())
    }
}

/// Explicit slug when given, generated from the title otherwise.
pub(crate) fn resolve_slug(kind: &str, explicit: Option<&str>, title: &str) -> String {
    match explicit.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => slug::generate(kind, title),
    }
}

/// `%query%` with LIKE wildcards escaped by `\`.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");

    format!("%{escaped}%")
}

pub(crate) fn search_term(q: &Option<String>) -> Option<&str> {
    q.as_deref().map(str::trim).filter(|q| !q.is_empty())
}
