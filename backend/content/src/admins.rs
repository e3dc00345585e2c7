use chrono::Utc;
use tokio::task::spawn_blocking;
use tracing::{info, warn};

use crate::{
    auth::{hash_password, verify_password, MIN_PASSWORD_LEN},
    error::StoreError,
    models::{required, AdminUser, MAX_USERNAME_LEN},
    store::Store,
};

const ADMIN_COLUMNS: &str = "id, username, password_hash, created_at";

impl Store {
    pub async fn create_admin(&self, username: &str, password: &str) -> Result<AdminUser, StoreError> {
        let username = username.trim();
        required("username", username, MAX_USERNAME_LEN)?;

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(StoreError::invalid(
                "password",
                format!("at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        let iterations = self.password_iterations;
        let password = password.to_string();
        let password_hash = spawn_blocking(move || hash_password(&password, iterations))
            .await
            .map_err(|e| StoreError::invalid("password", format!("hashing failed: {e}")))?;

        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            "INSERT INTO admin_users (username, password_hash, created_at) VALUES (?, ?, ?) \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::on_insert("admin user", username))?;

        info!("Created admin user {}", admin.username);
        Ok(admin)
    }

    pub async fn admin(&self, username: &str) -> Result<Option<AdminUser>, StoreError> {
        Ok(sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// The admin when the password matches, `None` otherwise.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<AdminUser>, StoreError> {
        let Some(admin) = self.admin(username.trim()).await? else {
            warn!("Login attempt for unknown admin {username:?}");
            return Ok(None);
        };

        let password = password.to_string();
        let encoded = admin.password_hash.clone();
        let valid = spawn_blocking(move || verify_password(&password, &encoded))
            .await
            .unwrap_or(false);

        if valid {
            Ok(Some(admin))
        } else {
            warn!("Wrong password for admin {}", admin.username);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> Store {
        Store::in_memory().await.unwrap().with_password_iterations(1_000)
    }

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let store = store().await;
        store.create_admin("testadmin", "testpass123").await.unwrap();

        let admin = store.authenticate("testadmin", "testpass123").await.unwrap();
        assert_eq!(admin.unwrap().username, "testadmin");

        assert!(store.authenticate("testadmin", "nope-nope").await.unwrap().is_none());
        assert!(store.authenticate("ghost", "testpass123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_clear() {
        let store = store().await;
        let admin = store.create_admin("admin", "supersecret").await.unwrap();

        assert!(!admin.password_hash.contains("supersecret"));
        assert!(admin.password_hash.starts_with("pbkdf2_sha256$1000$"));
    }

    #[tokio::test]
    async fn test_validation_and_conflicts() {
        let store = store().await;

        assert!(matches!(
            store.create_admin("", "longenough").await,
            Err(StoreError::Validation { field: "username", .. })
        ));
        assert!(matches!(
            store.create_admin("admin", "short").await,
            Err(StoreError::Validation { field: "password", .. })
        ));

        store.create_admin("admin", "longenough").await.unwrap();
        assert!(matches!(
            store.create_admin("admin", "longenough").await,
            Err(StoreError::Conflict { .. })
        ));
    }
}
