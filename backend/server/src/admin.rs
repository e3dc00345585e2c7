use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, Query, Request, State as AxumState},
    http::{
        header::{CONTENT_TYPE, LOCATION, SET_COOKIE},
        StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use content::{Counts, Devlog, DevlogFilter, DevlogInput, Project, ProjectFilter, ProjectInput, ProjectSummary, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    error::AppError,
    pages,
    session::{self, AdminSession},
    state::State,
};

#[derive(Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

/// Login body, either a submitted form or JSON.
impl<S: Send + Sync> FromRequest<S> for Credentials {
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            Json::<Credentials>::from_request(request, state)
                .await
                .map(|Json(credentials)| credentials)
                .map_err(|e| AppError::MalformedPayload(e.body_text()))
        } else {
            Form::<Credentials>::from_request(request, state)
                .await
                .map(|Form(credentials)| credentials)
                .map_err(|e| AppError::MalformedPayload(e.body_text()))
        }
    }
}

#[derive(Deserialize)]
pub struct BulkDelete {
    slugs: Vec<String>,
}

#[derive(Serialize)]
pub struct Deleted {
    deleted: u64,
}

/// Logs the outcome of an admin write and maps the store error.
fn audit<T>(session: &AdminSession, action: &str, target: &str, result: Result<T, StoreError>) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            info!("{} {action} {target}", session.username);
            Ok(value)
        }
        Err(e) => {
            error!("{} {action} {target} failed: {e}", session.username);
            Err(e.into())
        }
    }
}

pub async fn login_page(AxumState(state): AxumState<Arc<State>>) -> Html<String> {
    Html(pages::login(state.site(), None))
}

pub async fn login(AxumState(state): AxumState<Arc<State>>, credentials: Credentials) -> Result<Response, AppError> {
    let admin = state
        .store
        .authenticate(credentials.username.trim(), &credentials.password)
        .await?;

    let Some(admin) = admin else {
        warn!("Failed admin login for {}", credentials.username.trim());

        let page = pages::login(state.site(), Some("Invalid username or password."));
        return Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response());
    };

    info!("Admin {} logged in", admin.username);

    let cookie = session::set_cookie(
        &state.settings.secret_key,
        &admin.username,
        state.settings.security.session_cookie_secure,
    );

    Ok((StatusCode::FOUND, [(LOCATION, "/admin/".to_string()), (SET_COOKIE, cookie)]).into_response())
}

pub async fn logout(session: Option<AdminSession>) -> Response {
    if let Some(session) = session {
        info!("Admin {} logged out", session.username);
    }

    (
        StatusCode::FOUND,
        [(LOCATION, session::LOGIN_PATH.to_string()), (SET_COOKIE, session::clear_cookie())],
    )
        .into_response()
}

pub async fn overview(AxumState(state): AxumState<Arc<State>>, _session: AdminSession) -> Result<Json<Counts>, AppError> {
    Ok(Json(state.store.counts().await?))
}

pub async fn list_projects(
    AxumState(state): AxumState<Arc<State>>,
    _session: AdminSession,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Vec<ProjectSummary>>, AppError> {
    Ok(Json(state.store.list_projects(&filter).await?))
}

pub async fn create_project(
    AxumState(state): AxumState<Arc<State>>,
    session: AdminSession,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let project = audit(&session, "created project", &input.title, state.store.create_project(&input).await)?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    AxumState(state): AxumState<Arc<State>>,
    _session: AdminSession,
    Path(slug): Path<String>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(state.store.project(&slug).await?))
}

pub async fn update_project(
    AxumState(state): AxumState<Arc<State>>,
    session: AdminSession,
    Path(slug): Path<String>,
    Json(input): Json<ProjectInput>,
) -> Result<Json<Project>, AppError> {
    let project = audit(&session, "updated project", &slug, state.store.update_project(&slug, &input).await)?;

    Ok(Json(project))
}

pub async fn delete_project(
    AxumState(state): AxumState<Arc<State>>,
    session: AdminSession,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    audit(&session, "deleted project", &slug, state.store.delete_project(&slug).await)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_projects(
    AxumState(state): AxumState<Arc<State>>,
    session: AdminSession,
    Json(bulk): Json<BulkDelete>,
) -> Result<Json<Deleted>, AppError> {
    let target = bulk.slugs.join(", ");
    let deleted = audit(&session, "bulk deleted projects", &target, state.store.delete_projects(&bulk.slugs).await)?;

    Ok(Json(Deleted { deleted }))
}

pub async fn list_devlogs(
    AxumState(state): AxumState<Arc<State>>,
    _session: AdminSession,
    Query(filter): Query<DevlogFilter>,
) -> Result<Json<Vec<Devlog>>, AppError> {
    Ok(Json(state.store.list_devlogs(&filter).await?))
}

pub async fn create_devlog(
    AxumState(state): AxumState<Arc<State>>,
    session: AdminSession,
    Json(input): Json<DevlogInput>,
) -> Result<(StatusCode, Json<Devlog>), AppError> {
    let devlog = audit(&session, "created devlog", &input.title, state.store.create_devlog(&input).await)?;

    Ok((StatusCode::CREATED, Json(devlog)))
}

pub async fn get_devlog(
    AxumState(state): AxumState<Arc<State>>,
    _session: AdminSession,
    Path(slug): Path<String>,
) -> Result<Json<Devlog>, AppError> {
    Ok(Json(state.store.devlog(&slug).await?))
}

pub async fn update_devlog(
    AxumState(state): AxumState<Arc<State>>,
    session: AdminSession,
    Path(slug): Path<String>,
    Json(input): Json<DevlogInput>,
) -> Result<Json<Devlog>, AppError> {
    let devlog = audit(&session, "updated devlog", &slug, state.store.update_devlog(&slug, &input).await)?;

    Ok(Json(devlog))
}

pub async fn delete_devlog(
    AxumState(state): AxumState<Arc<State>>,
    session: AdminSession,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    audit(&session, "deleted devlog", &slug, state.store.delete_devlog(&slug).await)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_devlogs(
    AxumState(state): AxumState<Arc<State>>,
    session: AdminSession,
    Json(bulk): Json<BulkDelete>,
) -> Result<Json<Deleted>, AppError> {
    let target = bulk.slugs.join(", ");
    let deleted = audit(&session, "bulk deleted devlogs", &target, state.store.delete_devlogs(&bulk.slugs).await)?;

    Ok(Json(Deleted { deleted }))
}

pub fn router() -> Router<Arc<State>> {
    Router::new()
        .route("/admin/", get(overview))
        .route("/admin/login/", get(login_page).post(login))
        .route("/admin/logout/", post(logout))
        .route("/admin/projects/", get(list_projects).post(create_project))
        .route("/admin/projects/delete/", post(delete_projects))
        .route(
            "/admin/projects/{slug}/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/admin/devlogs/", get(list_devlogs).post(create_devlog))
        .route("/admin/devlogs/delete/", post(delete_devlogs))
        .route(
            "/admin/devlogs/{slug}/",
            get(get_devlog).put(update_devlog).delete(delete_devlog),
        )
}
