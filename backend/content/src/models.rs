use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::StoreError, slug};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_TAGLINE_LEN: usize = 300;
pub const MAX_USERNAME_LEN: usize = 150;

/// Portfolio project entry.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project row as listed in the admin, with the number of linked devlogs.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProjectSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,
    pub devlog_count: i64,
}

/// Development log entry. `content` is markdown, stored as written.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Devlog {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub tagline: String,
    pub content: String,
    pub is_published: bool,
    pub project_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub description: String,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevlogInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub tagline: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
    /// Slug of the project this devlog belongs to.
    #[serde(default)]
    pub project: Option<String>,
}

impl ProjectInput {
    pub fn validate(&self) -> Result<(), StoreError> {
        required("title", &self.title, MAX_TITLE_LEN)?;
        required("description", &self.description, usize::MAX)?;
        explicit_slug(&self.slug)
    }
}

impl DevlogInput {
    pub fn validate(&self) -> Result<(), StoreError> {
        required("title", &self.title, MAX_TITLE_LEN)?;
        required("tagline", &self.tagline, MAX_TAGLINE_LEN)?;
        explicit_slug(&self.slug)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFilter {
    pub q: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevlogFilter {
    pub q: Option<String>,
    pub published: Option<bool>,
    /// Project slug.
    pub project: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub projects: i64,
    pub featured_projects: i64,
    pub devlogs: i64,
    pub published_devlogs: i64,
}

pub(crate) fn required(field: &'static str, value: &str, max_len: usize) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::invalid(field, "this field is required"));
    }

    if value.chars().count() > max_len {
        return Err(StoreError::invalid(
            field,
            format!("at most {max_len} characters"),
        ));
    }

    Ok(())
}

fn explicit_slug(slug: &Option<String>) -> Result<(), StoreError> {
    match slug.as_deref() {
        Some(s) if !s.is_empty() => slug::validate(s),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_requires_title_and_description() {
        let input = ProjectInput {
            title: "   ".to_string(),
            description: "desc".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            input.validate(),
            Err(StoreError::Validation { field: "title", .. })
        ));

        let input = ProjectInput {
            title: "Title".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            input.validate(),
            Err(StoreError::Validation { field: "description", .. })
        ));
    }

    #[test]
    fn test_devlog_length_limits() {
        let input = DevlogInput {
            title: "t".repeat(MAX_TITLE_LEN),
            tagline: "x".repeat(MAX_TAGLINE_LEN + 1),
            ..Default::default()
        };
        assert!(matches!(
            input.validate(),
            Err(StoreError::Validation { field: "tagline", .. })
        ));
    }

    #[test]
    fn test_explicit_slug_must_be_url_safe() {
        let input = DevlogInput {
            title: "Title".to_string(),
            tagline: "Tagline".to_string(),
            slug: Some("not a slug".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = DevlogInput {
            slug: Some(String::new()),
            ..input
        };
        assert!(input.validate().is_ok());
    }
}
