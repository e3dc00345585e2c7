use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::{
    error::StoreError,
    models::{Devlog, Project, ProjectFilter, ProjectInput, ProjectSummary},
    store::{like_pattern, resolve_slug, search_term, Store},
};

const PROJECT_COLUMNS: &str = "id, title, slug, description, is_featured, created_at, updated_at";

/// Featured project with its published devlogs, as shown on the explore grid.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectCard {
    pub project: Project,
    pub devlogs: Vec<Devlog>,
}

impl Store {
    pub async fn create_project(&self, input: &ProjectInput) -> Result<Project, StoreError> {
        input.validate()?;

        let slug = resolve_slug("project", input.slug.as_deref(), &input.title);
        let now = Utc::now();

        let project = sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (title, slug, description, is_featured, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(input.title.trim())
        .bind(&slug)
        .bind(&input.description)
        .bind(input.is_featured)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::on_insert("project", &slug))?;

        info!("Created project {}", project.slug);
        Ok(project)
    }

    /// Replaces every field of the project. The slug is kept unless a new one is given.
    pub async fn update_project(&self, slug: &str, input: &ProjectInput) -> Result<Project, StoreError> {
        input.validate()?;

        let new_slug = match input.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => slug.to_string(),
        };

        let project = sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects SET title = ?, slug = ?, description = ?, is_featured = ?, updated_at = ? \
             WHERE slug = ? RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(input.title.trim())
        .bind(&new_slug)
        .bind(&input.description)
        .bind(input.is_featured)
        .bind(Utc::now())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::on_insert("project", &new_slug))?
        .ok_or(StoreError::NotFound("Project"))?;

        info!("Updated project {}", project.slug);
        Ok(project)
    }

    pub async fn delete_project(&self, slug: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Project"));
        }

        info!("Deleted project {slug}");
        Ok(())
    }

    /// Deletes all listed projects in one transaction. Unknown slugs are ignored.
    pub async fn delete_projects(&self, slugs: &[String]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;

        for slug in slugs {
            deleted += sqlx::query("DELETE FROM projects WHERE slug = ?")
                .bind(slug)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        info!("Deleted {deleted} project(s)");

        Ok(deleted)
    }

    pub async fn project(&self, slug: &str) -> Result<Project, StoreError> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("Project"))
    }

    pub async fn project_by_id(&self, id: i64) -> Result<Option<Project>, StoreError> {
        Ok(sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn featured_projects(&self) -> Result<Vec<Project>, StoreError> {
        Ok(sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE is_featured = 1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT p.id, p.title, p.slug, p.description, p.is_featured, p.created_at, p.updated_at, \
             (SELECT COUNT(*) FROM devlogs d WHERE d.project_id = p.id) AS devlog_count \
             FROM projects p WHERE 1 = 1",
        );

        if let Some(q) = search_term(&filter.q) {
            let pattern = like_pattern(q);
            query
                .push(" AND (p.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR p.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        if let Some(featured) = filter.featured {
            query.push(" AND p.is_featured = ").push_bind(featured);
        }

        query.push(" ORDER BY p.created_at DESC, p.id DESC");

        Ok(query
            .build_query_as::<ProjectSummary>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// Featured projects with their published devlogs, optionally narrowed by a
    /// case-insensitive search over project and devlog text.
    pub async fn explore(&self, query: Option<&str>) -> Result<Vec<ProjectCard>, StoreError> {
        let needle = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        let mut cards = Vec::new();

        for project in self.featured_projects().await? {
            let devlogs = self.published_for_project(project.id).await?;

            let matches = match &needle {
                None => true,
                Some(needle) => {
                    let hit = |text: &str| text.to_lowercase().contains(needle.as_str());

                    hit(&project.title)
                        || hit(&project.description)
                        || devlogs.iter().any(|d| hit(&d.title) || hit(&d.tagline))
                }
            };

            if matches {
                cards.push(ProjectCard { project, devlogs });
            }
        }

        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DevlogInput;

    fn project(title: &str, featured: bool) -> ProjectInput {
        ProjectInput {
            title: title.to_string(),
            slug: None,
            description: format!("About {title}"),
            is_featured: featured,
        }
    }

    #[tokio::test]
    async fn test_create_generates_slug() {
        let store = Store::in_memory().await.unwrap();

        let created = store.create_project(&project("Test Project", true)).await.unwrap();
        assert_eq!(created.slug, "test-project");
        assert!(created.is_featured);

        let fetched = store.project("test-project").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let store = Store::in_memory().await.unwrap();

        store.create_project(&project("Same", false)).await.unwrap();
        let err = store.create_project(&project("Same", false)).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict { kind: "project", .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_slug_and_touches_updated_at() {
        let store = Store::in_memory().await.unwrap();
        let created = store.create_project(&project("Original", false)).await.unwrap();

        let updated = store
            .update_project("original", &project("Renamed", true))
            .await
            .unwrap();

        assert_eq!(updated.slug, "original");
        assert_eq!(updated.title, "Renamed");
        assert!(updated.is_featured);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);

        assert!(matches!(
            store.update_project("missing", &project("X", false)).await,
            Err(StoreError::NotFound("Project"))
        ));
    }

    #[tokio::test]
    async fn test_delete_unlinks_devlogs() {
        let store = Store::in_memory().await.unwrap();
        store.create_project(&project("Parent", true)).await.unwrap();

        let devlog = store
            .create_devlog(&DevlogInput {
                title: "Child".to_string(),
                tagline: "tag".to_string(),
                project: Some("parent".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(devlog.project_id.is_some());

        store.delete_project("parent").await.unwrap();

        let devlog = store.devlog("child").await.unwrap();
        assert_eq!(devlog.project_id, None);
        assert!(store.delete_project("parent").await.is_err());
    }

    #[tokio::test]
    async fn test_bulk_delete_counts() {
        let store = Store::in_memory().await.unwrap();
        for title in ["One", "Two", "Three"] {
            store.create_project(&project(title, false)).await.unwrap();
        }

        let deleted = store
            .delete_projects(&["one".to_string(), "two".to_string(), "nope".to_string()])
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.counts().await.unwrap().projects, 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_counts_devlogs() {
        let store = Store::in_memory().await.unwrap();
        store.create_project(&project("Rust Proxy", true)).await.unwrap();
        store.create_project(&project("Python Pipeline", false)).await.unwrap();

        store
            .create_devlog(&DevlogInput {
                title: "Log".to_string(),
                tagline: "tag".to_string(),
                project: Some("rust-proxy".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let all = store.list_projects(&ProjectFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].project.slug, "python-pipeline");

        let rust = store
            .list_projects(&ProjectFilter {
                q: Some("rust".to_string()),
                featured: None,
            })
            .await
            .unwrap();
        assert_eq!(rust.len(), 1);
        assert_eq!(rust[0].devlog_count, 1);

        let unfeatured = store
            .list_projects(&ProjectFilter {
                q: None,
                featured: Some(false),
            })
            .await
            .unwrap();
        assert_eq!(unfeatured[0].project.slug, "python-pipeline");
    }

    #[tokio::test]
    async fn test_explore_only_featured_and_searchable() {
        let store = Store::in_memory().await.unwrap();
        store.create_project(&project("Shown", true)).await.unwrap();
        store.create_project(&project("Hidden", false)).await.unwrap();

        store
            .create_devlog(&DevlogInput {
                title: "Tunnel Notes".to_string(),
                tagline: "cloudflared setup".to_string(),
                is_published: true,
                project: Some("shown".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let cards = store.explore(None).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].devlogs.len(), 1);

        assert_eq!(store.explore(Some("CLOUDFLARED")).await.unwrap().len(), 1);
        assert!(store.explore(Some("hidden")).await.unwrap().is_empty());
        assert_eq!(store.explore(Some("  ")).await.unwrap().len(), 1);
    }
}
