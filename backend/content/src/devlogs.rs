use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::{
    error::StoreError,
    models::{Devlog, DevlogFilter, DevlogInput},
    store::{like_pattern, resolve_slug, search_term, Store},
};

const DEVLOG_COLUMNS: &str =
    "id, title, slug, tagline, content, is_published, project_id, created_at, updated_at";

impl Store {
    pub async fn create_devlog(&self, input: &DevlogInput) -> Result<Devlog, StoreError> {
        input.validate()?;

        let project_id = self.project_id_for(input.project.as_deref()).await?;
        let slug = resolve_slug("devlog", input.slug.as_deref(), &input.title);
        let now = Utc::now();

        let devlog = sqlx::query_as::<_, Devlog>(&format!(
            "INSERT INTO devlogs (title, slug, tagline, content, is_published, project_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {DEVLOG_COLUMNS}"
        ))
        .bind(input.title.trim())
        .bind(&slug)
        .bind(input.tagline.trim())
        .bind(&input.content)
        .bind(input.is_published)
        .bind(project_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::on_insert("devlog", &slug))?;

        info!("Created devlog {}", devlog.slug);
        Ok(devlog)
    }

    /// Replaces every field of the devlog. The slug is kept unless a new one is given.
    pub async fn update_devlog(&self, slug: &str, input: &DevlogInput) -> Result<Devlog, StoreError> {
        input.validate()?;

        let project_id = self.project_id_for(input.project.as_deref()).await?;
        let new_slug = match input.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => slug.to_string(),
        };

        let devlog = sqlx::query_as::<_, Devlog>(&format!(
            "UPDATE devlogs SET title = ?, slug = ?, tagline = ?, content = ?, is_published = ?, \
             project_id = ?, updated_at = ? WHERE slug = ? RETURNING {DEVLOG_COLUMNS}"
        ))
        .bind(input.title.trim())
        .bind(&new_slug)
        .bind(input.tagline.trim())
        .bind(&input.content)
        .bind(input.is_published)
        .bind(project_id)
        .bind(Utc::now())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::on_insert("devlog", &new_slug))?
        .ok_or(StoreError::NotFound("Devlog"))?;

        info!("Updated devlog {}", devlog.slug);
        Ok(devlog)
    }

    pub async fn delete_devlog(&self, slug: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM devlogs WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Devlog"));
        }

        info!("Deleted devlog {slug}");
        Ok(())
    }

    /// Deletes all listed devlogs in one transaction. Unknown slugs are ignored.
    pub async fn delete_devlogs(&self, slugs: &[String]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;

        for slug in slugs {
            deleted += sqlx::query("DELETE FROM devlogs WHERE slug = ?")
                .bind(slug)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        info!("Deleted {deleted} devlog(s)");

        Ok(deleted)
    }

    /// Any devlog, published or not.
    pub async fn devlog(&self, slug: &str) -> Result<Devlog, StoreError> {
        sqlx::query_as::<_, Devlog>(&format!(
            "SELECT {DEVLOG_COLUMNS} FROM devlogs WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("Devlog"))
    }

    /// Unpublished devlogs are reported as missing.
    pub async fn published_devlog(&self, slug: &str) -> Result<Devlog, StoreError> {
        sqlx::query_as::<_, Devlog>(&format!(
            "SELECT {DEVLOG_COLUMNS} FROM devlogs WHERE slug = ? AND is_published = 1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("Devlog"))
    }

    pub async fn latest_published(&self, limit: i64) -> Result<Vec<Devlog>, StoreError> {
        Ok(sqlx::query_as::<_, Devlog>(&format!(
            "SELECT {DEVLOG_COLUMNS} FROM devlogs WHERE is_published = 1 \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn published_for_project(&self, project_id: i64) -> Result<Vec<Devlog>, StoreError> {
        Ok(sqlx::query_as::<_, Devlog>(&format!(
            "SELECT {DEVLOG_COLUMNS} FROM devlogs WHERE project_id = ? AND is_published = 1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn list_devlogs(&self, filter: &DevlogFilter) -> Result<Vec<Devlog>, StoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {DEVLOG_COLUMNS} FROM devlogs WHERE 1 = 1"
        ));

        if let Some(q) = search_term(&filter.q) {
            let pattern = like_pattern(q);
            query
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR tagline LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR content LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        if let Some(published) = filter.published {
            query.push(" AND is_published = ").push_bind(published);
        }

        if let Some(project) = filter.project.as_deref() {
            query
                .push(" AND project_id = (SELECT id FROM projects WHERE slug = ")
                .push_bind(project.to_string())
                .push(")");
        }

        query.push(" ORDER BY created_at DESC, id DESC");

        Ok(query.build_query_as::<Devlog>().fetch_all(&self.pool).await?)
    }

    async fn project_id_for(&self, project_slug: Option<&str>) -> Result<Option<i64>, StoreError> {
        let Some(project_slug) = project_slug.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        match self.project(project_slug).await {
            Ok(project) => Ok(Some(project.id)),
            Err(StoreError::NotFound(_)) => Err(StoreError::invalid(
                "project",
                format!("no project with slug {project_slug:?}"),
            )),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectInput;

    fn devlog(title: &str, published: bool) -> DevlogInput {
        DevlogInput {
            title: title.to_string(),
            tagline: format!("{title} tagline"),
            content: format!("# {title}\n\nBody"),
            is_published: published,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_content_is_stored_verbatim() {
        let store = Store::in_memory().await.unwrap();
        let input = DevlogInput {
            content: "```rust\nfn main() {}\n```\n\n<b>raw</b> *md*".to_string(),
            ..devlog("Verbatim", true)
        };

        let created = store.create_devlog(&input).await.unwrap();
        assert_eq!(store.devlog(&created.slug).await.unwrap().content, input.content);
    }

    #[tokio::test]
    async fn test_unpublished_is_hidden() {
        let store = Store::in_memory().await.unwrap();
        store.create_devlog(&devlog("Draft", false)).await.unwrap();

        assert!(store.devlog("draft").await.is_ok());
        assert!(matches!(
            store.published_devlog("draft").await,
            Err(StoreError::NotFound("Devlog"))
        ));
    }

    #[tokio::test]
    async fn test_latest_published_is_newest_first_and_limited() {
        let store = Store::in_memory().await.unwrap();
        for i in 0..7 {
            store.create_devlog(&devlog(&format!("Post {i}"), true)).await.unwrap();
        }
        store.create_devlog(&devlog("Draft", false)).await.unwrap();

        let latest = store.latest_published(5).await.unwrap();

        assert_eq!(latest.len(), 5);
        assert_eq!(latest[0].slug, "post-6");
        assert!(latest.iter().all(|d| d.is_published));
    }

    #[tokio::test]
    async fn test_unknown_project_is_a_validation_error() {
        let store = Store::in_memory().await.unwrap();
        let input = DevlogInput {
            project: Some("ghost".to_string()),
            ..devlog("Orphan", true)
        };

        assert!(matches!(
            store.create_devlog(&input).await,
            Err(StoreError::Validation { field: "project", .. })
        ));
    }

    #[tokio::test]
    async fn test_update_can_change_slug() {
        let store = Store::in_memory().await.unwrap();
        store.create_devlog(&devlog("First", false)).await.unwrap();
        store.create_devlog(&devlog("Second", false)).await.unwrap();

        let input = DevlogInput {
            slug: Some("renamed".to_string()),
            ..devlog("First", true)
        };
        let updated = store.update_devlog("first", &input).await.unwrap();
        assert_eq!(updated.slug, "renamed");
        assert!(updated.is_published);

        let clash = DevlogInput {
            slug: Some("second".to_string()),
            ..devlog("First", true)
        };
        assert!(matches!(
            store.update_devlog("renamed", &clash).await,
            Err(StoreError::Conflict { kind: "devlog", .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = Store::in_memory().await.unwrap();
        store
            .create_project(&ProjectInput {
                title: "Site".to_string(),
                description: "d".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        store
            .create_devlog(&DevlogInput {
                project: Some("site".to_string()),
                ..devlog("Proxy Setup", true)
            })
            .await
            .unwrap();
        store.create_devlog(&devlog("Unrelated Draft", false)).await.unwrap();

        let by_project = store
            .list_devlogs(&DevlogFilter {
                project: Some("site".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_project.len(), 1);

        let drafts = store
            .list_devlogs(&DevlogFilter {
                published: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(drafts[0].slug, "unrelated-draft");

        let search = store
            .list_devlogs(&DevlogFilter {
                q: Some("proxy".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);

        let deleted = store
            .delete_devlogs(&["proxy-setup".to_string(), "unrelated-draft".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
    }
}
