//! Profile Endpoints

use axum::{extract::State, Json};

use crate::{
    db::User,
    error::ApiError,
    routes::auth::CurrentUser,
    services::{NewProfile, ProfileUpdate, ProfileView},
    AppState,
};

/// POST /users
///
/// 첫 로그인 시 호출. 이미 프로필이 있으면 그대로 반환
pub async fn provision_user(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Option<Json<NewProfile>>,
) -> Result<Json<User>, ApiError> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let profile = state.profiles.provision(&user.id, &user.email, input).await?;
    Ok(Json(profile))
}

/// GET /me
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileView>, ApiError> {
    Ok(Json(state.profiles.view(&user.id).await?))
}

/// PATCH /me
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.profiles.update(&user.id, update).await?))
}
