use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, PublicUser, RegisterRequest,
            VerifyEmailRequest,
        },
        jwt::AuthUser,
        services::{is_valid_email, normalize_email, AuthService},
    },
    error::{ApiJson, AuthError},
    state::AppState,
    users::services::UserLookup,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify-email", post(verify_email))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

fn validated_email(raw: &str) -> Result<String, AuthError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::invalid_argument("Invalid email"));
    }
    Ok(email)
}

fn require_password(password: &str) -> Result<(), AuthError> {
    if password.trim().is_empty() {
        return Err(AuthError::invalid_argument("Password is required"));
    }
    Ok(())
}

#[instrument(skip(service, payload))]
pub async fn register(
    State(service): State<AuthService>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let email = validated_email(&payload.email)?;
    require_password(&payload.password)?;

    service
        .register(&email, &payload.password, payload.display_name.as_deref())
        .await
        .map(Json)
}

#[instrument(skip(service, payload))]
pub async fn login(
    State(service): State<AuthService>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let email = validated_email(&payload.email)?;
    require_password(&payload.password)?;

    service.login(&email, &payload.password).await.map(Json)
}

#[instrument(skip(service, payload))]
pub async fn verify_email(
    State(service): State<AuthService>,
    ApiJson(payload): ApiJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    service.verify_email(&payload.token).await.map(Json)
}

#[instrument(skip(lookup, user), fields(user_id = user.id))]
pub async fn get_me(
    State(lookup): State<UserLookup>,
    user: AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    lookup.by_email(&user.email).await.map(Json)
}
