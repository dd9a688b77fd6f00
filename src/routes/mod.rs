//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                   - 서버 상태 확인
//!
//! POST  /users                    - 첫 로그인 시 프로필 생성
//! GET   /me                       - 프로필 + 전적
//! PATCH /me                       - username / 게임 내 이름 수정
//! GET   /me/tournaments?status=   - 내가 참가한 토너먼트
//!
//! GET   /tournaments?status=      - 로비 목록 (승인된 것만)
//! GET   /tournaments/:id          - 상세 + 참가 여부
//! POST  /tournaments/:id/join     - 참가 (참가비 차감)
//!
//! GET   /wallet                   - 잔액 + 히스토리
//! POST  /wallet/requests          - 입출금 요청
//! ```

pub mod auth;
pub mod health;
pub mod profile;
pub mod tournaments;
pub mod wallet;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// 라우터 생성 (미들웨어는 main에서 추가)
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Profile
        .route("/users", post(profile::provision_user))
        .route("/me", get(profile::get_me).patch(profile::update_me))
        .route("/me/tournaments", get(tournaments::my_tournaments))

        // Tournaments
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/tournaments/:id", get(tournaments::get_tournament))
        .route("/tournaments/:id/join", post(tournaments::join_tournament))

        // Wallet
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/requests", post(wallet::submit_request))

        // 상태 주입
        .with_state(state)
}
