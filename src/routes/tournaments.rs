//! Tournament Endpoints
//!
//! 로비 목록, 상세, 참가

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    db::Tournament,
    error::ApiError,
    routes::auth::CurrentUser,
    services::{JoinReceipt, TournamentDetail},
    types::TournamentStatus,
    AppState,
};

/// 목록 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Upcoming | Live | Completed | Cancelled (기본 Upcoming)
    pub status: Option<TournamentStatus>,
}

/// GET /tournaments?status=Upcoming
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Tournament>>, ApiError> {
    let tournaments = state.lobby.list(query.status.unwrap_or_default()).await?;
    Ok(Json(tournaments))
}

/// GET /tournaments/:id
pub async fn get_tournament(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<TournamentDetail>, ApiError> {
    let detail = state.lobby.detail(&id, &user.id).await?;
    Ok(Json(detail))
}

/// POST /tournaments/:id/join
///
/// # Response
///
/// ```json
/// {
///   "tournament_id": "t1",
///   "user_id": "uid",
///   "entry_fee": 5000,
///   "balance_after": 5000,
///   "slots_filled": 12,
///   "transaction_id": "4f1c...",
///   "joined_at": "2025-01-15T10:30:00Z"
/// }
/// ```
pub async fn join_tournament(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<JoinReceipt>, ApiError> {
    let receipt = state.joins.join(&user.id, &id).await?;
    Ok(Json(receipt))
}

/// GET /me/tournaments?status=Upcoming
pub async fn my_tournaments(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Tournament>>, ApiError> {
    let tournaments = state
        .lobby
        .joined_by(&user.id, query.status.unwrap_or_default())
        .await?;
    Ok(Json(tournaments))
}
