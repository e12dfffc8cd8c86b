//! Access control: who may call what, and who may touch which rows.
//!
//! Tier checks run as route-group middleware, so a rejected request never
//! reaches a handler or the database. Ownership checks are plain functions
//! evaluated by handlers against the row they are about to mutate.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use garden_types::models::{AuthMode, Role};

use crate::error::{ApiError, ApiResult};
use crate::extract::bearer_token;
use crate::sessions::{Session, SessionError};
use crate::state::AppState;

/// Resolve the request's session, requiring `role` when given.
pub fn authorize(state: &AppState, req: &Request, role: Option<Role>) -> ApiResult<Session> {
    let token = bearer_token(req.headers());
    state
        .sessions
        .authenticate(token.as_deref(), role)
        .map_err(|e| match e {
            SessionError::Missing | SessionError::Unknown => {
                ApiError::Authentication("login required".to_string())
            }
            SessionError::RoleMismatch { .. } => {
                warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
                ApiError::forbidden(e.to_string())
            }
        })
}

async fn gate(state: AppState, role: Option<Role>, mut req: Request, next: Next) -> ApiResult<Response> {
    let session = authorize(&state, &req, role)?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Any live session.
pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> ApiResult<Response> {
    gate(state, None, req, next).await
}

/// Registered account holders.
pub async fn require_user(State(state): State<AppState>, req: Request, next: Next) -> ApiResult<Response> {
    gate(state, Some(Role::User), req, next).await
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> ApiResult<Response> {
    gate(state, Some(Role::Admin), req, next).await
}

/// The diary zone: `user` sessions in per-user mode, `secret` sessions in
/// shared-secret mode.
pub async fn require_zone(State(state): State<AppState>, req: Request, next: Next) -> ApiResult<Response> {
    let role = state.mode.zone_role();
    gate(state, Some(role), req, next).await
}

/// Rows a zone session may list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Only rows attributed to this username.
    Own(String),
    All,
}

pub fn zone_scope(mode: AuthMode, session: &Session) -> Scope {
    match (mode, session.role) {
        (_, Role::Admin) | (AuthMode::SharedSecret, Role::Secret) => Scope::All,
        _ => Scope::Own(session.username.clone()),
    }
}

/// Whether `session` may edit or delete a diary written by `author`.
pub fn can_modify_diary(mode: AuthMode, session: &Session, author: &str) -> bool {
    match session.role {
        Role::Admin => true,
        Role::Secret => mode == AuthMode::SharedSecret,
        Role::User => mode == AuthMode::PerUser && session.username == author,
    }
}

pub fn ensure_diary_owner(mode: AuthMode, session: &Session, author: &str) -> ApiResult<()> {
    if can_modify_diary(mode, session, author) {
        Ok(())
    } else {
        warn!("{} tried to modify a diary by {}", session.username, author);
        Err(ApiError::forbidden("you can only modify your own diaries"))
    }
}

/// Whether `session` may delete a private note. Only the sender owns a note.
pub fn can_delete_note(mode: AuthMode, session: &Session, from_name: &str) -> bool {
    match session.role {
        Role::Admin => true,
        Role::Secret => mode == AuthMode::SharedSecret,
        Role::User => mode == AuthMode::PerUser && session.username == from_name,
    }
}

pub fn ensure_note_sender(mode: AuthMode, session: &Session, from_name: &str) -> ApiResult<()> {
    if can_delete_note(mode, session, from_name) {
        Ok(())
    } else {
        warn!("{} tried to delete a note sent by {}", session.username, from_name);
        Err(ApiError::forbidden("you can only delete notes you sent"))
    }
}
