//! Join-Tournament Transaction
//!
//! 한 사용자를 한 토너먼트에 원자적으로 등록한다.
//!
//! ```text
//!   read user, tournament, participant   (snapshot)
//!              │
//!              ▼
//!        plan_join()  ── JoinError ──▶ abort, no writes
//!              │
//!              ▼
//!   debit + ledger entry (fee > 0)
//!   slots_filled += 1
//!   participant record
//!              │
//!              ▼
//!   commit ── conflict ──▶ retry from the top (bounded)
//! ```
//!
//! 규칙 판단은 순수 함수 [`plan_join`]에 있고, 스냅샷 읽기와 원자적 커밋은
//! 각 repository 구현(`Database`, `MemoryDatabase`)이 담당한다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{ArenaRepository, LedgerEntry, Participant, Tournament, User};
use crate::error::{JoinError, StoreError};
use crate::types::{Amount, TournamentStatus, ENTRY_FEE_CATEGORY};

/// 커밋할 쓰기 목록
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    /// 참가 후 잔액 (무료면 변경 없음)
    pub balance_after: Amount,

    /// 참가비 > 0 일 때만 존재. 잔액 차감과 같은 커밋에 기록되어야 함
    pub ledger_entry: Option<LedgerEntry>,

    /// 증가된 slots_filled
    pub slots_filled: u32,

    pub participant: Participant,
}

impl JoinPlan {
    /// 잔액 쓰기가 필요한지
    pub fn debits_wallet(&self) -> bool {
        self.ledger_entry.is_some()
    }

    pub fn receipt(&self, entry_fee: Amount) -> JoinReceipt {
        JoinReceipt {
            tournament_id: self.participant.tournament_id.clone(),
            user_id: self.participant.user_id.clone(),
            entry_fee,
            balance_after: self.balance_after,
            slots_filled: self.slots_filled,
            transaction_id: self.ledger_entry.as_ref().map(|e| e.id),
            joined_at: self.participant.join_time,
        }
    }
}

/// 참가 성공 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinReceipt {
    pub tournament_id: String,
    pub user_id: String,
    pub entry_fee: Amount,
    pub balance_after: Amount,
    pub slots_filled: u32,
    /// 무료 참가면 None
    pub transaction_id: Option<Uuid>,
    pub joined_at: DateTime<Utc>,
}

/// 스냅샷에 대해 참가 규칙을 평가하고 쓰기 목록을 만든다
///
/// 거절 순서: NotFound → InsufficientFunds → TournamentFull → AlreadyJoined → NotJoinable
pub fn plan_join(
    user: Option<&User>,
    tournament: Option<&Tournament>,
    already_joined: bool,
    now: DateTime<Utc>,
) -> Result<JoinPlan, JoinError> {
    let (user, tournament) = match (user, tournament) {
        (Some(u), Some(t)) => (u, t),
        _ => return Err(JoinError::NotFound),
    };

    let entry_fee = tournament.entry_fee;

    if user.wallet_balance < entry_fee {
        return Err(JoinError::InsufficientFunds);
    }
    if tournament.slots_filled >= tournament.slots_total {
        return Err(JoinError::TournamentFull);
    }
    if already_joined {
        return Err(JoinError::AlreadyJoined);
    }
    if tournament.status != TournamentStatus::Upcoming {
        return Err(JoinError::NotJoinable);
    }

    let (balance_after, ledger_entry) = if entry_fee.is_positive() {
        // 위에서 balance >= fee 확인됨
        let balance_after = user
            .wallet_balance
            .checked_sub(entry_fee)
            .ok_or(JoinError::InsufficientFunds)?;
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            user_id: user.id.clone(),
            amount: -entry_fee,
            category: ENTRY_FEE_CATEGORY.to_string(),
            description: format!("Joined: {}", tournament.title),
            tournament_id: Some(tournament.id.clone()),
            timestamp: now,
        };
        (balance_after, Some(entry))
    } else {
        (user.wallet_balance, None)
    };

    let participant = Participant {
        tournament_id: tournament.id.clone(),
        user_id: user.id.clone(),
        username: user.username.clone(),
        in_game_name: user.display_in_game_name().to_string(),
        join_time: now,
        rank: 0,
        kills: 0,
        winnings: Amount::ZERO,
    };

    Ok(JoinPlan {
        balance_after,
        ledger_entry,
        slots_filled: tournament.slots_filled + 1,
        participant,
    })
}

/// 충돌 재시도 정책
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 최초 시도 포함
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// n번째 실패 후 대기 시간: [0, base * n] 구간의 무작위 값
    fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let ceiling = base_ms.saturating_mul(u64::from(attempt));
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(20),
        }
    }
}

/// `StoreError::Conflict`이면 처음부터 다시 실행, 그 외 결과는 그대로 반환
///
/// 한도를 넘기면 `StoreError::Busy`
pub async fn retry_on_conflict<T, F, Fut>(policy: RetryPolicy, mut run: F) -> Result<T, StoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match run(attempt).await {
            Err(StoreError::Conflict) if attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(attempt, ?delay, "write conflict, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(StoreError::Conflict) => {
                tracing::warn!(attempt, "write conflict, giving up");
                return Err(StoreError::Busy { attempts: attempt });
            }
            other => return other,
        }
    }
}

/// 참가 서비스
pub struct JoinService {
    store: Arc<dyn ArenaRepository>,
    policy: RetryPolicy,
}

impl JoinService {
    pub fn new(store: Arc<dyn ArenaRepository>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// joinTournament
    ///
    /// 성공하면 잔액 차감, ledger 기록, slot 증가, 참가 기록이 모두 반영되고
    /// 실패하면 아무것도 반영되지 않음
    pub async fn join(&self, user_id: &str, tournament_id: &str) -> Result<JoinReceipt, StoreError> {
        let store = &self.store;
        let result = retry_on_conflict(self.policy, move |attempt| {
            tracing::debug!(user_id, tournament_id, attempt, "join attempt");
            store.try_join(user_id, tournament_id, Utc::now())
        })
        .await;

        match &result {
            Ok(receipt) => tracing::info!(
                user_id,
                tournament_id,
                fee = %receipt.entry_fee,
                slots_filled = receipt.slots_filled,
                "joined tournament"
            ),
            Err(StoreError::Rejected(reason)) => {
                tracing::info!(user_id, tournament_id, code = reason.code(), "join rejected")
            }
            Err(e) => tracing::error!(user_id, tournament_id, error = %e, "join failed"),
        }

        result
    }
}
