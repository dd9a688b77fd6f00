//! Wallet Endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    db::WalletRequest,
    error::ApiError,
    routes::auth::CurrentUser,
    services::{SubmitRequest, WalletOverview},
    AppState,
};

/// GET /wallet
///
/// 잔액 + 통합 히스토리 (ledger 항목과 입출금 요청, 최신순)
pub async fn get_wallet(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<WalletOverview>, ApiError> {
    Ok(Json(state.wallet.overview(&user.id).await?))
}

/// POST /wallet/requests
///
/// # Request
///
/// ```json
/// { "type": "Withdrawal", "amount": "150.00", "details": "name@bank" }
/// ```
pub async fn submit_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<WalletRequest>), ApiError> {
    let request = state.wallet.submit(&user.id, req).await?;
    Ok((StatusCode::CREATED, Json(request)))
}
