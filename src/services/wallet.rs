//! Wallet Service
//!
//! - 입출금 요청 제출 (관리자 수동 검토, 잔액은 건드리지 않음)
//! - 지갑 히스토리: ledger 항목과 요청을 하나의 목록으로 병합

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{ArenaRepository, LedgerEntry, WalletRequest};
use crate::error::ApiError;
use crate::types::{Amount, RequestKind, RequestStatus};

/// 요청 제출 입력
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "type")]
    pub kind: RequestKind,

    /// major 단위 문자열 ("150.50")
    pub amount: String,

    /// 입금: 결제 트랜잭션 ID / 출금: UPI ID
    pub details: String,
}

/// 히스토리 항목 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Ledger,
    Request,
}

/// 통합 히스토리 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub source: HistorySource,
    pub id: Uuid,
    /// ledger: 카테고리, 요청: "Deposit" / "Withdrawal"
    pub title: String,
    pub description: String,
    /// 잔액 기준 부호 (출금 요청은 음수)
    pub amount: Amount,
    /// ledger 항목은 이미 반영되었으므로 None
    pub status: Option<RequestStatus>,
    pub tournament_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<LedgerEntry> for HistoryEntry {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            source: HistorySource::Ledger,
            id: entry.id,
            title: entry.category,
            description: entry.description,
            amount: entry.amount,
            status: None,
            tournament_id: entry.tournament_id,
            timestamp: entry.timestamp,
        }
    }
}

impl From<WalletRequest> for HistoryEntry {
    fn from(request: WalletRequest) -> Self {
        let (amount, description) = match request.kind {
            RequestKind::Deposit => (
                request.amount,
                format!("Ref: {}", request.transaction_ref.unwrap_or_default()),
            ),
            RequestKind::Withdrawal => (
                -request.amount,
                format!("To: {}", request.upi_id.unwrap_or_default()),
            ),
        };

        Self {
            source: HistorySource::Request,
            id: request.id,
            title: request.kind.to_string(),
            description,
            amount,
            status: Some(request.status),
            tournament_id: None,
            timestamp: request.created_at,
        }
    }
}

/// 지갑 화면 데이터
#[derive(Debug, Serialize)]
pub struct WalletOverview {
    pub balance: Amount,
    pub history: Vec<HistoryEntry>,
}

/// ledger + 요청 병합, 최신순
pub fn merge_history(ledger: Vec<LedgerEntry>, requests: Vec<WalletRequest>) -> Vec<HistoryEntry> {
    let mut history: Vec<HistoryEntry> = ledger
        .into_iter()
        .map(HistoryEntry::from)
        .chain(requests.into_iter().map(HistoryEntry::from))
        .collect();

    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    history
}

/// 입력 형식 검증 (저장소 접근 전)
pub fn validate_submission(req: &SubmitRequest) -> Result<Amount, ApiError> {
    if req.amount.trim().is_empty() || req.details.trim().is_empty() {
        return Err(ApiError::ValidationError("All fields are required.".to_string()));
    }

    match Amount::parse_major(&req.amount) {
        Ok(amount) if amount.is_positive() => Ok(amount),
        _ => Err(ApiError::ValidationError("Please enter a valid amount.".to_string())),
    }
}

pub struct WalletService {
    store: Arc<dyn ArenaRepository>,
    min_withdrawal: Amount,
}

impl WalletService {
    pub fn new(store: Arc<dyn ArenaRepository>, min_withdrawal: Amount) -> Self {
        Self {
            store,
            min_withdrawal,
        }
    }

    /// submitRequest
    ///
    /// Pending 상태의 요청 1건 insert. 잔액은 관리자 승인 시점에 반영됨
    pub async fn submit(&self, user_id: &str, req: SubmitRequest) -> Result<WalletRequest, ApiError> {
        let amount = validate_submission(&req)?;

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

        if req.kind == RequestKind::Withdrawal {
            if amount < self.min_withdrawal {
                return Err(ApiError::ValidationError(format!(
                    "Minimum withdrawal amount is {}.",
                    self.min_withdrawal
                )));
            }
            if amount > user.wallet_balance {
                return Err(ApiError::ValidationError(
                    "Withdrawal amount cannot exceed your wallet balance.".to_string(),
                ));
            }
        }

        let details = req.details.trim().to_string();
        let (transaction_ref, upi_id) = match req.kind {
            RequestKind::Deposit => (Some(details), None),
            RequestKind::Withdrawal => (None, Some(details)),
        };

        let request = WalletRequest {
            id: Uuid::new_v4(),
            user_id: user.id.clone(),
            username: user.username.clone(),
            kind: req.kind,
            amount,
            transaction_ref,
            upi_id,
            status: RequestStatus::Pending,
            admin_note: None,
            created_at: Utc::now(),
        };

        self.store.insert_request(&request).await?;
        tracing::info!(
            user_id,
            request_id = %request.id,
            kind = %request.kind,
            amount = %request.amount,
            "wallet request submitted"
        );

        Ok(request)
    }

    /// 잔액 + 통합 히스토리
    pub async fn overview(&self, user_id: &str) -> Result<WalletOverview, ApiError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User".to_string()))?;

        let ledger = self.store.transactions_for(user_id).await?;
        let requests = self.store.requests_for(user_id).await?;

        Ok(WalletOverview {
            balance: user.wallet_balance,
            history: merge_history(ledger, requests),
        })
    }
}
