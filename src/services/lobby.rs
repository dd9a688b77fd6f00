//! Lobby Service
//!
//! 토너먼트 목록, 상세, 내가 참가한 토너먼트

use std::sync::Arc;

use serde::Serialize;

use crate::db::{ArenaRepository, Tournament};
use crate::error::ApiError;
use crate::types::TournamentStatus;

/// 상세 조회 응답
#[derive(Debug, Serialize)]
pub struct TournamentDetail {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub slots_left: u32,
    /// 호출자의 참가 여부
    pub joined: bool,
}

/// 로비 정렬: 시작 시간 오름차순, Completed만 최신순
pub fn sort_for_lobby(status: TournamentStatus, tournaments: &mut [Tournament]) {
    if status == TournamentStatus::Completed {
        tournaments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    } else {
        tournaments.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    }
}

pub struct LobbyService {
    store: Arc<dyn ArenaRepository>,
}

impl LobbyService {
    pub fn new(store: Arc<dyn ArenaRepository>) -> Self {
        Self { store }
    }

    /// 승인된 토너먼트 목록
    pub async fn list(&self, status: TournamentStatus) -> Result<Vec<Tournament>, ApiError> {
        let mut tournaments = self.store.list_tournaments(status).await?;
        sort_for_lobby(status, &mut tournaments);
        tracing::debug!(%status, count = tournaments.len(), "lobby listing");
        Ok(tournaments)
    }

    pub async fn detail(&self, tournament_id: &str, user_id: &str) -> Result<TournamentDetail, ApiError> {
        let tournament = self
            .store
            .get_tournament(tournament_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Tournament".to_string()))?;
        let joined = self.store.is_participant(tournament_id, user_id).await?;

        Ok(TournamentDetail {
            slots_left: tournament.slots_left(),
            tournament,
            joined,
        })
    }

    /// 내가 참가한 토너먼트 (시작 시간 오름차순)
    pub async fn joined_by(
        &self,
        user_id: &str,
        status: TournamentStatus,
    ) -> Result<Vec<Tournament>, ApiError> {
        let mut tournaments = self.store.joined_tournaments(user_id, status).await?;
        tournaments.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(tournaments)
    }
}
