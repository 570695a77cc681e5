use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateProfileRequest},
    extractors::AuthUser,
    repo_types::User,
    services,
};
use crate::{error::AppResult, state::AppState, validation::AppJson};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let reg = services::validate_registration(payload)?;
    let res = services::register(state.users.as_ref(), &state.jwt, reg).await?;
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let creds = services::validate_login(payload)?;
    let res = services::login(state.users.as_ref(), &state.jwt, creds).await?;
    Ok(Json(res))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<User>> {
    let user = services::profile(state.users.as_ref(), me.id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, me, payload), fields(user_id = %me.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<PublicUser>> {
    let name = services::validate_profile_update(payload)?;
    let user = services::update_profile(state.users.as_ref(), me.id, name).await?;
    Ok(Json(user))
}
