//! Tournament Arena API Library
//!
//! # Overview
//!
//! 토너먼트 로비, 지갑, 참가(참가비 차감) 백엔드 API
//!
//! ## Request flow
//!
//! ```text
//!   HTTP ─▶ routes::* (CurrentUser, Json)
//!             │
//!             ▼
//!   services: JoinService │ WalletService │ LobbyService │ ProfileService
//!             │
//!             ▼
//!   Arc<dyn ArenaRepository>
//!        ├─ Database        PostgreSQL, SERIALIZABLE tx
//!        └─ MemoryDatabase  versioned documents, CAS commit
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 비즈니스 로직 (참가, 지갑, 로비, 프로필)
//! - `db`: 저장소 (PostgreSQL / 인메모리)
//! - `types`: 금액, 상태 enum
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tourney_api::{config::Config, db::MemoryDatabase, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(Arc::new(MemoryDatabase::new()), config);
//!     let app = tourney_api::routes::router(state);
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod db;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{ApiError, JoinError, StoreError};
pub use db::{ArenaRepository, Database, MemoryDatabase};
pub use services::{JoinService, LobbyService, ProfileService, WalletService};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ArenaRepository>,
    pub joins: Arc<JoinService>,
    pub wallet: Arc<WalletService>,
    pub lobby: Arc<LobbyService>,
    pub profiles: Arc<ProfileService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// 저장소 하나를 모든 서비스가 공유
    pub fn new(store: Arc<dyn ArenaRepository>, config: Config) -> Self {
        Self {
            joins: Arc::new(JoinService::new(store.clone(), config.join_retry)),
            wallet: Arc::new(WalletService::new(store.clone(), config.min_withdrawal)),
            lobby: Arc::new(LobbyService::new(store.clone())),
            profiles: Arc::new(ProfileService::new(store.clone())),
            store,
            config: Arc::new(config),
        }
    }
}
