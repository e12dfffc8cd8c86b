use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use garden_types::models::AuthMode;

use crate::error::ApiError;
use crate::policy::{require_admin, require_session, require_user, require_zone};
use crate::state::AppState;
use crate::{admin, auth, public, zone};

/// Build the full HTTP surface for `state.mode`.
///
/// Each tier is its own router with the tier check as a `route_layer`, so the
/// check only guards routes that exist and unknown paths still reach the
/// fallback.
pub fn router(state: AppState) -> Router {
    let mut open = Router::new()
        .route("/health", get(health))
        .route("/api/public/diaries", get(public::list_diaries))
        .route(
            "/api/public/messages",
            get(public::list_messages).post(public::post_message),
        )
        .route("/api/public/user-messages", get(public::list_user_messages))
        .route("/api/admin/login", post(auth::admin_login));

    open = match state.mode {
        AuthMode::PerUser => open
            .route("/api/auth/register", post(auth::register))
            .route("/api/auth/login", post(auth::login)),
        AuthMode::SharedSecret => open.route("/api/secret/login", post(auth::secret_login)),
    };

    let session_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let zone_routes = Router::new()
        .route(
            "/api/secret/diaries",
            get(zone::list_diaries).post(zone::create_diary),
        )
        .route(
            "/api/secret/diaries/{id}",
            put(zone::update_diary).delete(zone::delete_diary),
        )
        .route(
            "/api/secret/messages",
            get(zone::list_notes).post(zone::send_note),
        )
        .route(
            "/api/secret/messages/{id}",
            delete(zone::delete_note),
        )
        .route("/api/secret/user-messages", post(zone::post_user_message))
        .route_layer(from_fn_with_state(state.clone(), require_zone));

    let admin_routes = Router::new()
        .route("/api/admin/summary", get(admin::summary))
        .route("/api/admin/diaries", get(admin::list_diaries))
        .route(
            "/api/admin/diaries/{id}",
            put(admin::update_diary).delete(admin::delete_diary),
        )
        .route("/api/admin/messages/public", get(admin::list_public_messages))
        .route(
            "/api/admin/messages/public/{id}",
            put(admin::moderate_public_message).delete(admin::delete_public_message),
        )
        .route(
            "/api/admin/messages/private",
            get(admin::list_private_messages),
        )
        .route(
            "/api/admin/messages/private/{id}",
            delete(admin::delete_private_message),
        )
        .route("/api/admin/users", get(admin::list_users))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let mut app = Router::new()
        .merge(open)
        .merge(session_routes)
        .merge(zone_routes)
        .merge(admin_routes);

    if state.mode == AuthMode::PerUser {
        let account_routes = Router::new()
            .route("/api/auth/me", get(auth::me))
            .route("/api/auth/summary", get(auth::summary))
            .route_layer(from_fn_with_state(state.clone(), require_user));
        app = app.merge(account_routes);
    }

    app.fallback(fallback)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "mode": state.mode }))
}

async fn fallback() -> ApiError {
    ApiError::not_found("route")
}
