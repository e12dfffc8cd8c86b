use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::{info, warn};

use garden_db::seed::SECRET_PASSWORD_KEY;
use garden_types::api::{
    AccountSummary, Ack, AuthResponse, LoginRequest, ProfileResponse, RegisterRequest,
    SecretLoginRequest,
};
use garden_types::models::Role;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ClientIp, JsonBody, bearer_token};
use crate::rate_limit::RateLimitAction;
use crate::sessions::Session;
use crate::state::{AppState, blocking};
use crate::validate;

/// Identity recorded for passphrase sessions that did not give a nickname.
const SECRET_IDENTITY: &str = "secret";

fn throttle(state: &AppState, ip: &str, action: RateLimitAction) -> ApiResult<()> {
    if state.login_limiter.allow(ip, action) {
        Ok(())
    } else {
        warn!("Rate limited {} from {}", action, ip);
        Err(ApiError::RateLimited(
            "too many attempts, try again later".to_string(),
        ))
    }
}

fn bad_credentials() -> ApiError {
    ApiError::Authentication("invalid username or password".to_string())
}

fn issue(state: &AppState, role: Role, username: String) -> AuthResponse {
    let token = state.sessions.issue(role, &username);
    AuthResponse {
        token,
        username,
        role,
    }
}

pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    throttle(&state, &ip, RateLimitAction::Register)?;

    let username = validate::username(&req.username)?;
    validate::new_password(&req.password, req.confirm_password.as_deref())?;

    let name = username.clone();
    let reg_ip = ip.clone();
    blocking(&state, move |db| {
        let hash = garden_crypto::hash_password(&req.password)?;
        db.create_user(&name, Role::User.as_str(), &hash, &reg_ip)
    })
    .await?;

    info!("Registered user {} from {}", username, ip);
    Ok((StatusCode::CREATED, Json(issue(&state, Role::User, username))))
}

pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    throttle(&state, &ip, RateLimitAction::Login)?;
    let username = account_login(&state, &ip, req, Role::User).await?;
    info!("User {} logged in from {}", username, ip);
    Ok(Json(issue(&state, Role::User, username)))
}

pub async fn admin_login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    throttle(&state, &ip, RateLimitAction::AdminLogin)?;
    let username = account_login(&state, &ip, req, Role::Admin).await?;
    info!("Admin {} logged in from {}", username, ip);
    Ok(Json(issue(&state, Role::Admin, username)))
}

/// Check a stored account of exactly `role` and stamp the login. Admin
/// credentials never open a user session and vice versa.
async fn account_login(
    state: &AppState,
    ip: &str,
    req: LoginRequest,
    role: Role,
) -> ApiResult<String> {
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let name = username.clone();
    let login_ip = ip.to_string();
    let accepted = blocking(state, move |db| {
        // Every rejection pays for one key derivation.
        let Some(user) = db.get_user_by_username(&name)? else {
            return Ok(garden_crypto::verify_missing(&req.password));
        };
        let verified = garden_crypto::verify_password(&req.password, &user.password_hash);
        if !verified || user.role != role.as_str() {
            return Ok(false);
        }
        db.record_login(user.id, &login_ip)?;
        Ok(true)
    })
    .await?;

    if !accepted {
        warn!("Failed {} login for '{}' from {}", role, username, ip);
        return Err(bad_credentials());
    }
    Ok(username)
}

pub async fn secret_login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    JsonBody(req): JsonBody<SecretLoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    throttle(&state, &ip, RateLimitAction::SecretLogin)?;
    if req.password.is_empty() {
        return Err(ApiError::validation("passphrase is required"));
    }

    let password = req.password;
    let accepted = blocking(&state, move |db| {
        let stored = db.get_setting(SECRET_PASSWORD_KEY)?;
        Ok(stored.is_some_and(|hash| garden_crypto::verify_password(&password, &hash)))
    })
    .await?;

    if !accepted {
        warn!("Failed passphrase login from {}", ip);
        return Err(ApiError::Authentication("invalid passphrase".to_string()));
    }

    let identity = validate::display_name(req.nickname.as_deref(), SECRET_IDENTITY);

    info!("Passphrase session opened for {} from {}", identity, ip);
    Ok(Json(issue(&state, Role::Secret, identity)))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> ApiResult<Json<Ack>> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(&token);
    }
    info!("{} {} logged out", session.role, session.username);
    Ok(Json(Ack::new("logged out")))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<ProfileResponse>> {
    let name = session.username.clone();
    let user = blocking(&state, move |db| db.get_user_by_username(&name))
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    Ok(Json(crate::views::profile(user)))
}

pub async fn summary(State(state): State<AppState>) -> ApiResult<Json<AccountSummary>> {
    let counts = blocking(&state, |db| db.account_counts()).await?;
    Ok(Json(AccountSummary {
        user_count: counts.members,
        poster_count: counts.posters,
        user_messages: counts.user_messages,
    }))
}
