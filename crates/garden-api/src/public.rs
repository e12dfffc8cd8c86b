use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode};
use tracing::{info, warn};

use garden_types::api::{Created, Items, PublicDiary, PublicMessage, PublicMessageRequest, UserMessage};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ClientIp, JsonBody};
use crate::state::{AppState, blocking};
use crate::validate::{self, GUESTBOOK_MAX_CHARS};
use crate::views;

const PUBLIC_DIARY_LIMIT: u32 = 6;
const PUBLIC_MESSAGE_LIMIT: u32 = 50;
const USER_MESSAGE_LIMIT: u32 = 80;

pub async fn list_diaries(State(state): State<AppState>) -> ApiResult<Json<Items<PublicDiary>>> {
    let rows = blocking(&state, |db| db.list_public_diaries(PUBLIC_DIARY_LIMIT)).await?;
    let items: Vec<_> = rows.into_iter().map(views::public_diary).collect();
    Ok(Json(items.into()))
}

pub async fn list_messages(State(state): State<AppState>) -> ApiResult<Json<Items<PublicMessage>>> {
    let rows = blocking(&state, |db| db.list_visible_public_messages(PUBLIC_MESSAGE_LIMIT)).await?;
    let items: Vec<_> = rows.into_iter().map(views::public_message).collect();
    Ok(Json(items.into()))
}

/// Anonymous guestbook post. One accepted post per IP per cooldown; rejected
/// input and failed inserts do not consume the slot.
pub async fn post_message(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    JsonBody(req): JsonBody<PublicMessageRequest>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let content = validate::bounded_text(&req.content, GUESTBOOK_MAX_CHARS, "content")?;
    let nickname = validate::escape_markup(&validate::nickname(req.nickname.as_deref()));
    let content = validate::escape_markup(&content);

    let stamped_at = Instant::now();
    if !state.post_cooldown.try_acquire_at(&ip, stamped_at) {
        warn!("Guestbook cooldown hit from {}", ip);
        return Err(ApiError::RateLimited(format!(
            "please wait {} seconds between posts",
            state.post_cooldown.cooldown().as_secs()
        )));
    }

    let id = match blocking(&state, move |db| db.insert_public_message(&nickname, &content)).await {
        Ok(id) => id,
        Err(e) => {
            state.post_cooldown.release(&ip, stamped_at);
            return Err(e);
        }
    };
    info!("Guestbook message {} posted from {}", id, ip);
    Ok((
        StatusCode::CREATED,
        Json(Created {
            id,
            message: "message posted".to_string(),
        }),
    ))
}

pub async fn list_user_messages(State(state): State<AppState>) -> ApiResult<Json<Items<UserMessage>>> {
    let rows = blocking(&state, |db| db.list_user_messages(USER_MESSAGE_LIMIT)).await?;
    let items: Vec<_> = rows.into_iter().map(views::user_message).collect();
    Ok(Json(items.into()))
}
