//! The diary zone: diaries, private notes and attributed guestbook posts for
//! logged-in users (per-user mode) or passphrase holders (shared-secret mode).

use axum::{Extension, Json, extract::State, http::StatusCode};
use tracing::{info, warn};

use garden_db::models::DiaryRow;
use garden_types::api::{
    Ack, CreateDiaryRequest, Created, DiaryResponse, Items, Note, SendNoteRequest,
    UpdateDiaryRequest, UserMessageRequest,
};
use garden_types::models::AuthMode;

use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParam};
use crate::policy::{self, Scope};
use crate::sessions::Session;
use crate::state::{AppState, blocking};
use crate::validate::{self, GUESTBOOK_MAX_CHARS, NOTE_MAX_CHARS, USERNAME_MAX_CHARS};
use crate::views;

const NOTE_LIST_LIMIT: u32 = 80;

fn created(id: i64, message: &str) -> (StatusCode, Json<Created>) {
    (
        StatusCode::CREATED,
        Json(Created {
            id,
            message: message.to_string(),
        }),
    )
}

// -- Diaries --

pub async fn list_diaries(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Items<DiaryResponse>>> {
    let scope = policy::zone_scope(state.mode, &session);
    let rows = blocking(&state, move |db| match scope {
        Scope::Own(author) => db.list_diaries_by_author(&author),
        Scope::All => db.list_all_diaries(),
    })
    .await?;

    let items: Vec<_> = rows
        .into_iter()
        .map(|row| {
            let can_edit = policy::can_modify_diary(state.mode, &session, &row.author_name);
            views::diary(row, can_edit)
        })
        .collect();
    Ok(Json(items.into()))
}

pub async fn create_diary(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<CreateDiaryRequest>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let title = validate::diary_title(req.title.as_deref())?;
    let content = validate::required_text(&req.content, "content")?;
    let is_public = req.is_public;

    let author = session.username.clone();
    let id = blocking(&state, move |db| db.insert_diary(&author, &title, &content, is_public)).await?;

    info!("{} wrote diary {} (public: {})", session.username, id, is_public);
    Ok(created(id, "diary saved"))
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

/// Apply a partial update: blank or absent fields keep their stored value.
pub(crate) fn merge_diary(
    current: &DiaryRow,
    req: &UpdateDiaryRequest,
) -> ApiResult<(String, String, bool)> {
    let title = match req.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => validate::diary_title(Some(title))?,
        None if current.title.trim().is_empty() => validate::DEFAULT_TITLE.to_string(),
        None => current.title.clone(),
    };
    let content = req
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map_or_else(|| current.content.clone(), str::to_string);
    let is_public = req.is_public.unwrap_or(current.is_public);
    Ok((title, content, is_public))
}

async fn load_diary(state: &AppState, id: i64) -> ApiResult<DiaryRow> {
    blocking(state, move |db| db.get_diary(id))
        .await?
        .ok_or_else(|| ApiError::not_found("diary"))
}

/// Fetch, check ownership, then write. Concurrent edits of one diary are
/// last-writer-wins.
pub(crate) async fn update_diary_as(
    state: &AppState,
    session: &Session,
    id: i64,
    req: UpdateDiaryRequest,
) -> ApiResult<()> {
    let current = load_diary(state, id).await?;
    policy::ensure_diary_owner(state.mode, session, &current.author_name)?;

    let (title, content, is_public) = merge_diary(&current, &req)?;
    let updated = blocking(state, move |db| db.update_diary(id, &title, &content, is_public)).await?;
    if !updated {
        return Err(ApiError::not_found("diary"));
    }
    info!("{} {} updated diary {}", session.role, session.username, id);
    Ok(())
}

pub(crate) async fn delete_diary_as(state: &AppState, session: &Session, id: i64) -> ApiResult<()> {
    let current = load_diary(state, id).await?;
    policy::ensure_diary_owner(state.mode, session, &current.author_name)?;

    if !blocking(state, move |db| db.delete_diary(id)).await? {
        return Err(ApiError::not_found("diary"));
    }
    info!("{} {} deleted diary {}", session.role, session.username, id);
    Ok(())
}

// -- Private notes --

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Items<Note>>> {
    let scope = policy::zone_scope(state.mode, &session);
    let rows = blocking(&state, move |db| match scope {
        Scope::Own(name) => db.list_private_messages_for(&name, NOTE_LIST_LIMIT),
        Scope::All => db.list_all_private_messages(NOTE_LIST_LIMIT),
    })
    .await?;
    let items: Vec<_> = rows.into_iter().map(views::note).collect();
    Ok(Json(items.into()))
}

pub async fn send_note(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<SendNoteRequest>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let to_name: String = req.to_name.trim().chars().take(USERNAME_MAX_CHARS).collect();
    if to_name.is_empty() {
        return Err(ApiError::validation("recipient is required"));
    }
    let content = validate::bounded_text(&req.content, NOTE_MAX_CHARS, "note")?;

    let require_recipient = state.mode == AuthMode::PerUser;
    let from_name = session.username.clone();
    let recipient = to_name.clone();
    let id = blocking(&state, move |db| {
        if require_recipient && !db.user_exists(&recipient)? {
            return Ok(None);
        }
        db.insert_private_message(&from_name, &recipient, &content).map(Some)
    })
    .await?;

    let Some(id) = id else {
        warn!("{} tried to send a note to unknown user '{}'", session.username, to_name);
        return Err(ApiError::validation(
            "notes can only be sent to registered users",
        ));
    };
    info!("{} sent note {} to {}", session.username, id, to_name);
    Ok(created(id, "note delivered"))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Ack>> {
    let note = blocking(&state, move |db| db.get_private_message(id))
        .await?
        .ok_or_else(|| ApiError::not_found("note"))?;
    policy::ensure_note_sender(state.mode, &session, &note.from_name)?;

    if !blocking(&state, move |db| db.delete_private_message(id)).await? {
        return Err(ApiError::not_found("note"));
    }
    info!("{} deleted note {}", session.username, id);
    Ok(Json(Ack::new("note deleted")))
}

// -- Attributed guestbook --

pub async fn post_user_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<UserMessageRequest>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let content = validate::bounded_text(&req.content, GUESTBOOK_MAX_CHARS, "content")?;
    let content = validate::escape_markup(&content);

    let username = session.username.clone();
    let id = blocking(&state, move |db| db.insert_user_message(&username, &content)).await?;
    info!("{} posted guestbook message {}", session.username, id);
    Ok(created(id, "message posted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> DiaryRow {
        DiaryRow {
            id: 1,
            author_name: "luna".into(),
            title: "夜".into(),
            content: "安".into(),
            is_public: true,
            created_at: "2024-05-01 20:00:00".into(),
            updated_at: "2024-05-01 20:00:00".into(),
        }
    }

    #[test]
    fn empty_update_keeps_everything() {
        let merged = merge_diary(&row(), &UpdateDiaryRequest::default()).unwrap();
        assert_eq!(merged, ("夜".to_string(), "安".to_string(), true));
    }

    #[test]
    fn blank_fields_keep_stored_values() {
        let req = UpdateDiaryRequest {
            title: Some("  ".into()),
            content: Some("".into()),
            is_public: Some(false),
        };
        let merged = merge_diary(&row(), &req).unwrap();
        assert_eq!(merged, ("夜".to_string(), "安".to_string(), false));
    }

    #[test]
    fn new_values_are_trimmed_and_checked() {
        let req = UpdateDiaryRequest {
            title: Some(" 晨 ".into()),
            content: Some(" 早 ".into()),
            is_public: None,
        };
        assert_eq!(
            merge_diary(&row(), &req).unwrap(),
            ("晨".to_string(), "早".to_string(), true)
        );

        let too_long = UpdateDiaryRequest {
            title: Some("t".repeat(81)),
            ..Default::default()
        };
        assert!(merge_diary(&row(), &too_long).is_err());
    }

    #[test]
    fn untitled_rows_get_the_default_title() {
        let mut untitled = row();
        untitled.title.clear();
        let (title, _, _) = merge_diary(&untitled, &UpdateDiaryRequest::default()).unwrap();
        assert_eq!(title, validate::DEFAULT_TITLE);
    }
}
