//! Database Models
//!
//! Records shared by every repository backend. Field sets match the
//! `users`, `tournaments`, `participants`, `transactions` and `requests`
//! collections; enum columns are stored as their display strings.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{Amount, RequestKind, RequestStatus, Role, TournamentStatus};

/// 사용자 프로필 + 지갑
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct User {
    /// Identity provider가 발급한 uid
    pub id: String,

    pub username: String,

    pub email: String,

    /// 비어 있으면 참가 시 username으로 대체
    pub in_game_name: String,

    /// 지갑 잔액 (항상 0 이상)
    #[sqlx(try_from = "i64")]
    pub wallet_balance: Amount,

    #[sqlx(try_from = "String")]
    pub role: Role,

    pub is_banned: bool,

    pub profile_pic_url: String,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// 첫 로그인 시 생성되는 기본 프로필
    pub fn new_profile(id: &str, username: &str, email: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            in_game_name: String::new(),
            wallet_balance: Amount::ZERO,
            role: Role::User,
            is_banned: false,
            profile_pic_url: String::new(),
            created_at: now,
        }
    }

    /// 참가자 레코드에 복사될 게임 내 이름
    pub fn display_in_game_name(&self) -> &str {
        if self.in_game_name.is_empty() {
            &self.username
        } else {
            &self.in_game_name
        }
    }
}

/// 토너먼트
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Tournament {
    pub id: String,

    pub title: String,

    #[sqlx(try_from = "String")]
    pub status: TournamentStatus,

    #[sqlx(try_from = "i64")]
    pub entry_fee: Amount,

    /// 표시용 (정산 로직 없음)
    #[sqlx(try_from = "i64")]
    pub prize_pool: Amount,

    #[sqlx(try_from = "i32")]
    pub slots_total: u32,

    /// 참가 트랜잭션만 증가시킴
    #[sqlx(try_from = "i32")]
    pub slots_filled: u32,

    pub map: String,

    /// Solo / Duo / Squad
    pub mode: String,

    pub start_time: DateTime<Utc>,

    /// 관리자 승인된 토너먼트만 로비에 노출
    pub is_approved: bool,
}

impl Tournament {
    pub fn slots_left(&self) -> u32 {
        self.slots_total.saturating_sub(self.slots_filled)
    }
}

/// 참가 기록 (tournament, user) 쌍당 최대 1개
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Participant {
    pub tournament_id: String,

    pub user_id: String,

    pub username: String,

    pub in_game_name: String,

    pub join_time: DateTime<Utc>,

    /// 결과 입력 전에는 0
    #[sqlx(try_from = "i32")]
    pub rank: u32,

    #[sqlx(try_from = "i32")]
    pub kills: u32,

    #[sqlx(try_from = "i64")]
    pub winnings: Amount,
}

/// 지갑 ledger 항목 (append-only)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,

    pub user_id: String,

    /// 부호 있는 금액 (참가비는 음수)
    #[sqlx(try_from = "i64")]
    pub amount: Amount,

    /// "Entry Fee", "Deposit", "Winnings" 등
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub category: String,

    pub description: String,

    pub tournament_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

/// 입출금 요청 (관리자 수동 처리)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct WalletRequest {
    pub id: Uuid,

    pub user_id: String,

    pub username: String,

    #[sqlx(rename = "type")]
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub kind: RequestKind,

    #[sqlx(try_from = "i64")]
    pub amount: Amount,

    /// 입금: 결제 트랜잭션 ID
    pub transaction_ref: Option<String>,

    /// 출금: 지급받을 UPI ID
    pub upi_id: Option<String>,

    #[sqlx(try_from = "String")]
    pub status: RequestStatus,

    pub admin_note: Option<String>,

    pub created_at: DateTime<Utc>,
}
