//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `JoinService`: 토너먼트 참가 트랜잭션 (참가비 차감 + ledger + slot)
//! - `WalletService`: 입출금 요청, 지갑 히스토리
//! - `LobbyService`: 토너먼트 목록/상세
//! - `ProfileService`: 프로필, 전적 통계

pub mod join;
mod lobby;
mod profile;
mod wallet;

pub use join::{plan_join, JoinPlan, JoinReceipt, JoinService, RetryPolicy};
pub use lobby::{LobbyService, TournamentDetail};
pub use profile::{NewProfile, PlayerStats, ProfileService, ProfileUpdate, ProfileView};
pub use wallet::{HistoryEntry, SubmitRequest, WalletOverview, WalletService};
