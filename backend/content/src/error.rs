use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("A {kind} with slug {slug:?} already exists")]
    Conflict { kind: &'static str, slug: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Turns a unique constraint violation into [`StoreError::Conflict`].
    pub(crate) fn on_insert<'a>(kind: &'static str, slug: &'a str) -> impl FnOnce(sqlx::Error) -> Self + 'a {
        move |e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict {
                kind,
                slug: slug.to_string(),
            },
            _ => StoreError::Database(e),
        }
    }
}
