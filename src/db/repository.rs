//! Repository Pattern Implementation
//!
//! 데이터 접근 로직을 `ArenaRepository` trait 뒤로 숨긴다.
//!
//! ```text
//!   Services ──▶ Arc<dyn ArenaRepository>
//!                    │
//!          ┌─────────┴──────────┐
//!          ▼                    ▼
//!      Database           MemoryDatabase
//!    (PostgreSQL)      (versioned documents)
//! ```
//!
//! 구현체는 `main`에서 한 번 생성되어 `AppState`로 주입된다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{LedgerEntry, Participant, Tournament, User, WalletRequest};
use crate::error::StoreError;
use crate::services::JoinReceipt;
use crate::types::TournamentStatus;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ArenaRepository: Send + Sync {
    /// 저장소 연결 확인
    async fn health_check(&self) -> StoreResult<()>;

    // ============ Users ============

    /// 없으면 생성, 있으면 기존 프로필 반환
    async fn create_user(&self, user: &User) -> StoreResult<User>;

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>>;

    /// username 중복 시 `StoreError::Duplicate`
    async fn update_profile(
        &self,
        user_id: &str,
        username: &str,
        in_game_name: &str,
    ) -> StoreResult<User>;

    // ============ Tournaments ============

    async fn get_tournament(&self, tournament_id: &str) -> StoreResult<Option<Tournament>>;

    /// 승인된 토너먼트 중 status가 일치하는 것 (정렬 없음)
    async fn list_tournaments(&self, status: TournamentStatus) -> StoreResult<Vec<Tournament>>;

    async fn is_participant(&self, tournament_id: &str, user_id: &str) -> StoreResult<bool>;

    /// 사용자가 참가한 토너먼트 중 status가 일치하는 것 (정렬 없음)
    async fn joined_tournaments(
        &self,
        user_id: &str,
        status: TournamentStatus,
    ) -> StoreResult<Vec<Tournament>>;

    /// 사용자의 모든 참가 기록
    async fn participations(&self, user_id: &str) -> StoreResult<Vec<Participant>>;

    /// 참가 트랜잭션 1회 시도
    ///
    /// 스냅샷 읽기 → `plan_join` → 원자적 커밋.
    /// 동시 쓰기 충돌이면 아무것도 반영하지 않고 `StoreError::Conflict` 반환
    async fn try_join(
        &self,
        user_id: &str,
        tournament_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<JoinReceipt>;

    // ============ Wallet ============

    async fn insert_request(&self, request: &WalletRequest) -> StoreResult<()>;

    async fn transactions_for(&self, user_id: &str) -> StoreResult<Vec<LedgerEntry>>;

    async fn requests_for(&self, user_id: &str) -> StoreResult<Vec<WalletRequest>>;
}
