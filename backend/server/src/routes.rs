use std::sync::Arc;

use axum::{
    extract::{Path, Query, State as AxumState},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::{Html, IntoResponse},
};
use content::markdown;
use serde::Deserialize;

use crate::{error::AppError, feed, pages, state::State, utils::absolute_base};

pub const HOME_LIMIT: i64 = 5;

#[derive(Deserialize)]
pub struct Search {
    q: Option<String>,
}

pub async fn home_handler(AxumState(state): AxumState<Arc<State>>) -> Result<Html<String>, AppError> {
    let devlogs = state.store.latest_published(HOME_LIMIT).await?;
    let projects = state.store.featured_projects().await?;

    Ok(Html(pages::home(state.site(), &devlogs, &projects)))
}

pub async fn explore_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(search): Query<Search>,
) -> Result<Html<String>, AppError> {
    let query = search.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let cards = state.store.explore(query).await?;

    Ok(Html(pages::explore(state.site(), &cards, query)))
}

pub async fn devlog_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let devlog = state.store.published_devlog(&slug).await?;

    let project = match devlog.project_id {
        Some(id) => state.store.project_by_id(id).await?,
        None => None,
    };

    let html = markdown::to_html(&devlog.content);

    Ok(Html(pages::devlog(state.site(), &devlog, &html, project.as_ref())))
}

pub async fn project_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let project = state.store.project(&slug).await?;
    let devlogs = state.store.published_for_project(project.id).await?;

    Ok(Html(pages::project(state.site(), &project, &devlogs)))
}

pub async fn rss_handler(
    AxumState(state): AxumState<Arc<State>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let devlogs = state.store.latest_published(feed::FEED_LIMIT).await?;
    let channel = feed::channel(&state.settings.site_title, &absolute_base(&headers), &devlogs);

    Ok((
        [(CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        channel.to_string(),
    ))
}

pub async fn not_found_handler() -> AppError {
    AppError::NotFound
}
