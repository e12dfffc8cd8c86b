use axum::{Extension, Json, extract::State};
use tracing::info;

use garden_types::api::{
    Ack, AdminSummary, DiaryResponse, Items, ModerateMessageRequest, ModeratedMessage, Note,
    UpdateDiaryRequest, UserEntry,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParam};
use crate::sessions::Session;
use crate::state::{AppState, blocking};
use crate::views;
use crate::zone::{delete_diary_as, update_diary_as};

const PUBLIC_MESSAGE_LIMIT: u32 = 100;
const PRIVATE_MESSAGE_LIMIT: u32 = 120;

pub async fn summary(State(state): State<AppState>) -> ApiResult<Json<AdminSummary>> {
    let counts = blocking(&state, |db| db.admin_counts()).await?;
    Ok(Json(AdminSummary {
        diary_total: counts.diary_total,
        diary_public: counts.diary_public,
        messages_public: counts.messages_public,
        messages_private: counts.messages_private,
        user_count: counts.users,
    }))
}

// -- Diaries --

pub async fn list_diaries(State(state): State<AppState>) -> ApiResult<Json<Items<DiaryResponse>>> {
    let rows = blocking(&state, |db| db.list_all_diaries()).await?;
    let items: Vec<_> = rows.into_iter().map(|row| views::diary(row, true)).collect();
    Ok(Json(items.into()))
}

pub async fn update_diary(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<UpdateDiaryRequest>,
) -> ApiResult<Json<Ack>> {
    update_diary_as(&state, &session, id, req).await?;
    Ok(Json(Ack::new("diary updated")))
}

pub async fn delete_diary(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Ack>> {
    delete_diary_as(&state, &session, id).await?;
    Ok(Json(Ack::new("diary deleted")))
}

// -- Guestbook moderation --

pub async fn list_public_messages(
    State(state): State<AppState>,
) -> ApiResult<Json<Items<ModeratedMessage>>> {
    let rows = blocking(&state, |db| db.list_all_public_messages(PUBLIC_MESSAGE_LIMIT)).await?;
    let items: Vec<_> = rows.into_iter().map(views::moderated_message).collect();
    Ok(Json(items.into()))
}

pub async fn moderate_public_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ModerateMessageRequest>,
) -> ApiResult<Json<Ack>> {
    let hidden = req.is_hidden;
    if !blocking(&state, move |db| db.set_public_message_hidden(id, hidden)).await? {
        return Err(ApiError::not_found("message"));
    }
    info!("Admin {} set message {} hidden={}", session.username, id, hidden);
    Ok(Json(Ack::new(if hidden { "message hidden" } else { "message visible" })))
}

pub async fn delete_public_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Ack>> {
    if !blocking(&state, move |db| db.delete_public_message(id)).await? {
        return Err(ApiError::not_found("message"));
    }
    info!("Admin {} deleted public message {}", session.username, id);
    Ok(Json(Ack::new("message deleted")))
}

// -- Private notes --

pub async fn list_private_messages(State(state): State<AppState>) -> ApiResult<Json<Items<Note>>> {
    let rows = blocking(&state, |db| db.list_all_private_messages(PRIVATE_MESSAGE_LIMIT)).await?;
    let items: Vec<_> = rows.into_iter().map(views::note).collect();
    Ok(Json(items.into()))
}

pub async fn delete_private_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Ack>> {
    if !blocking(&state, move |db| db.delete_private_message(id)).await? {
        return Err(ApiError::not_found("note"));
    }
    info!("Admin {} deleted note {}", session.username, id);
    Ok(Json(Ack::new("note deleted")))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Items<UserEntry>>> {
    let rows = blocking(&state, |db| db.list_users()).await?;
    let items: Vec<_> = rows.into_iter().map(views::user_entry).collect();
    Ok(Json(items.into()))
}
