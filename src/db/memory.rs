//! In-memory repository
//!
//! 문서마다 version을 두고, 커밋 시 읽었던 version이 그대로인지 확인한다
//! (compare-and-swap). 달라졌으면 아무것도 쓰지 않고 `StoreError::Conflict`.
//!
//! 참가 기록 추가는 항상 tournament 문서의 version을 올리므로
//! user + tournament 두 문서의 version만 비교하면 참가 여부 변화도 감지된다.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{LedgerEntry, Participant, Tournament, User, WalletRequest};
use super::repository::{ArenaRepository, StoreResult};
use crate::error::{JoinError, StoreError};
use crate::services::{plan_join, JoinReceipt};
use crate::types::TournamentStatus;

#[derive(Debug, Clone)]
struct Versioned<T> {
    version: u64,
    doc: T,
}

impl<T> Versioned<T> {
    fn new(doc: T) -> Self {
        Self { version: 1, doc }
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, Versioned<User>>,
    tournaments: HashMap<String, Versioned<Tournament>>,
    /// (tournament_id, user_id)
    participants: HashMap<(String, String), Participant>,
    transactions: Vec<LedgerEntry>,
    requests: Vec<WalletRequest>,
}

impl MemoryState {
    fn username_taken(&self, username: &str, except_user: &str) -> bool {
        self.users
            .values()
            .any(|u| u.doc.username == username && u.doc.id != except_user)
    }
}

/// 프로세스 내 저장소 (개발/테스트용)
#[derive(Default)]
pub struct MemoryDatabase {
    state: RwLock<MemoryState>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// 토너먼트 등록 (관리자 워크플로 대체용 시드)
    pub async fn insert_tournament(&self, tournament: Tournament) {
        let mut state = self.state.write().await;
        state
            .tournaments
            .insert(tournament.id.clone(), Versioned::new(tournament));
    }

    /// 토너먼트의 참가 기록 수
    pub async fn participant_count(&self, tournament_id: &str) -> usize {
        let state = self.state.read().await;
        state
            .participants
            .keys()
            .filter(|(t, _)| t == tournament_id)
            .count()
    }
}

#[async_trait]
impl ArenaRepository for MemoryDatabase {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: &User) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.users.get(&user.id) {
            return Ok(existing.doc.clone());
        }
        if state.username_taken(&user.username, &user.id) {
            return Err(StoreError::Duplicate(user.username.clone()));
        }

        state
            .users
            .insert(user.id.clone(), Versioned::new(user.clone()));
        Ok(user.clone())
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(user_id).map(|u| u.doc.clone()))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        username: &str,
        in_game_name: &str,
    ) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.username_taken(username, user_id) {
            return Err(StoreError::Duplicate(username.to_string()));
        }

        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::Missing("User".to_string()))?;
        user.doc.username = username.to_string();
        user.doc.in_game_name = in_game_name.to_string();
        user.bump();

        Ok(user.doc.clone())
    }

    async fn get_tournament(&self, tournament_id: &str) -> StoreResult<Option<Tournament>> {
        let state = self.state.read().await;
        Ok(state.tournaments.get(tournament_id).map(|t| t.doc.clone()))
    }

    async fn list_tournaments(&self, status: TournamentStatus) -> StoreResult<Vec<Tournament>> {
        let state = self.state.read().await;
        Ok(state
            .tournaments
            .values()
            .filter(|t| t.doc.is_approved && t.doc.status == status)
            .map(|t| t.doc.clone())
            .collect())
    }

    async fn is_participant(&self, tournament_id: &str, user_id: &str) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .participants
            .contains_key(&(tournament_id.to_string(), user_id.to_string())))
    }

    async fn joined_tournaments(
        &self,
        user_id: &str,
        status: TournamentStatus,
    ) -> StoreResult<Vec<Tournament>> {
        let state = self.state.read().await;
        Ok(state
            .participants
            .keys()
            .filter(|(_, u)| u == user_id)
            .filter_map(|(t, _)| state.tournaments.get(t))
            .filter(|t| t.doc.status == status)
            .map(|t| t.doc.clone())
            .collect())
    }

    async fn participations(&self, user_id: &str) -> StoreResult<Vec<Participant>> {
        let state = self.state.read().await;
        Ok(state
            .participants
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn try_join(
        &self,
        user_id: &str,
        tournament_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<JoinReceipt> {
        let key = (tournament_id.to_string(), user_id.to_string());

        // 1. 스냅샷
        let (user, tournament, already_joined) = {
            let state = self.state.read().await;
            (
                state.users.get(user_id).cloned(),
                state.tournaments.get(tournament_id).cloned(),
                state.participants.contains_key(&key),
            )
        };

        // 2. 규칙 평가 (락 없이)
        let plan = plan_join(
            user.as_ref().map(|u| &u.doc),
            tournament.as_ref().map(|t| &t.doc),
            already_joined,
            now,
        )?;
        let (read_user, read_tournament) = match (user, tournament) {
            (Some(u), Some(t)) => (u, t),
            _ => return Err(JoinError::NotFound.into()),
        };

        // 3. CAS 커밋
        let mut state = self.state.write().await;

        let user_version = state.users.get(user_id).map(|u| u.version);
        let tournament_version = state.tournaments.get(tournament_id).map(|t| t.version);
        if user_version != Some(read_user.version)
            || tournament_version != Some(read_tournament.version)
        {
            return Err(StoreError::Conflict);
        }

        if let Some(entry) = &plan.ledger_entry {
            if let Some(user) = state.users.get_mut(user_id) {
                user.doc.wallet_balance = plan.balance_after;
                user.bump();
            }
            state.transactions.push(entry.clone());
        }

        if let Some(tournament) = state.tournaments.get_mut(tournament_id) {
            tournament.doc.slots_filled = plan.slots_filled;
            tournament.bump();
        }

        state.participants.insert(key, plan.participant.clone());

        Ok(plan.receipt(read_tournament.doc.entry_fee))
    }

    async fn insert_request(&self, request: &WalletRequest) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.requests.push(request.clone());
        Ok(())
    }

    async fn transactions_for(&self, user_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn requests_for(&self, user_id: &str) -> StoreResult<Vec<WalletRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Amount;

    fn tournament(id: &str, status: TournamentStatus, approved: bool) -> Tournament {
        Tournament {
            id: id.to_string(),
            title: id.to_uppercase(),
            status,
            entry_fee: Amount::ZERO,
            prize_pool: Amount::ZERO,
            slots_total: 4,
            slots_filled: 0,
            map: "Miramar".to_string(),
            mode: "Duo".to_string(),
            start_time: Utc::now(),
            is_approved: approved,
        }
    }

    #[tokio::test]
    async fn test_create_user_is_idempotent() {
        let db = MemoryDatabase::new();
        let first = User::new_profile("u1", "alpha", "a@example.com", Utc::now());
        db.create_user(&first).await.unwrap();

        let mut again = first.clone();
        again.username = "renamed".to_string();
        let stored = db.create_user(&again).await.unwrap();

        assert_eq!(stored.username, "alpha");
    }

    #[tokio::test]
    async fn test_username_must_be_unique() {
        let db = MemoryDatabase::new();
        db.create_user(&User::new_profile("u1", "alpha", "a@x.io", Utc::now()))
            .await
            .unwrap();
        db.create_user(&User::new_profile("u2", "bravo", "b@x.io", Utc::now()))
            .await
            .unwrap();

        let err = db.update_profile("u2", "alpha", "").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // 자기 자신의 username 유지는 허용
        let user = db.update_profile("u1", "alpha", "AlphaWolf").await.unwrap();
        assert_eq!(user.in_game_name, "AlphaWolf");

        let err = db.update_profile("ghost", "ghost", "").await.unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn test_listing_hides_unapproved() {
        let db = MemoryDatabase::new();
        db.insert_tournament(tournament("a", TournamentStatus::Upcoming, true)).await;
        db.insert_tournament(tournament("b", TournamentStatus::Upcoming, false)).await;
        db.insert_tournament(tournament("c", TournamentStatus::Live, true)).await;

        let upcoming = db.list_tournaments(TournamentStatus::Upcoming).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "a");
    }

    #[tokio::test]
    async fn test_join_bumps_tournament_version() {
        let db = MemoryDatabase::new();
        let mut user = User::new_profile("u1", "alpha", "a@x.io", Utc::now());
        user.wallet_balance = Amount::from_major(10);
        db.create_user(&user).await.unwrap();
        db.insert_tournament(tournament("a", TournamentStatus::Upcoming, true)).await;

        let read_version = db.state.read().await.tournaments["a"].version;
        db.try_join("u1", "a", Utc::now()).await.unwrap();
        let after = db.state.read().await.tournaments["a"].version;

        assert!(after > read_version);
        assert_eq!(db.participant_count("a").await, 1);
    }
}
