//! # Content
//!
//! Devlogs and projects behind the site, shared by the app server and the
//! deploy tool.
//!
//! ## Data
//!
//! - **Project**: title, slug, description, featured flag
//! - **Devlog**: title, slug, tagline, markdown content, published flag,
//!   optional project (unlinked when the project is deleted)
//! - **AdminUser**: username and PBKDF2 password hash
//!
//! Both content types are ordered newest first. Slugs are generated from the
//! title when not given and must be unique per type.
//!
//! ## Visibility
//!
//! - Only published devlogs are ever rendered publicly
//! - Home shows the 5 latest, the feed the 20 latest
//! - Explore shows featured projects only
mod admins;
pub mod auth;
mod devlogs;
pub mod error;
pub mod markdown;
pub mod models;
mod projects;
pub mod sample;
pub mod slug;
pub mod store;

pub use error::StoreError;
pub use models::{
    AdminUser, Counts, Devlog, DevlogFilter, DevlogInput, Project, ProjectFilter, ProjectInput,
    ProjectSummary,
};
pub use projects::ProjectCard;
pub use store::Store;
