//! Profile Service
//!
//! 첫 로그인 시 프로필 생성, 프로필 수정, 전적 통계

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::db::{ArenaRepository, Participant, User};
use crate::error::{ApiError, StoreError};
use crate::types::Amount;

const MIN_USERNAME_LEN: usize = 3;

/// 자동 생성 username이 이미 있을 때 suffix를 붙여 재시도하는 횟수
const DERIVED_USERNAME_ATTEMPTS: u32 = 8;

/// 전적 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStats {
    pub total_matches: u32,
    pub total_kills: u32,
    pub total_winnings: Amount,
    /// rank 1 횟수
    pub wins: u32,
    /// wins / total_matches 백분율, 소수점 1자리 (경기 없으면 0)
    pub win_rate: f64,
}

impl PlayerStats {
    pub fn from_participations(participations: &[Participant]) -> Self {
        let mut stats = participations.iter().fold(Self::default(), |mut stats, p| {
            stats.total_matches += 1;
            stats.total_kills += p.kills;
            stats.total_winnings = stats
                .total_winnings
                .checked_add(p.winnings)
                .unwrap_or(stats.total_winnings);
            if p.rank == 1 {
                stats.wins += 1;
            }
            stats
        });

        if stats.total_matches > 0 {
            let ratio = f64::from(stats.wins) / f64::from(stats.total_matches);
            stats.win_rate = (ratio * 1000.0).round() / 10.0;
        }
        stats
    }
}

/// 프로필 + 통계
#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    pub stats: PlayerStats,
}

/// 프로필 생성 입력
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProfile {
    /// 없으면 이메일 로컬 파트 사용
    pub username: Option<String>,
    pub profile_pic_url: Option<String>,
}

/// 프로필 수정 입력
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    #[serde(default)]
    pub in_game_name: String,
}

/// 이메일에서 기본 username 추출 ("Alpha.Wolf@x.io" -> "alphawolf")
fn default_username(email: &str, user_id: &str) -> String {
    let local: String = email
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    if local.len() >= MIN_USERNAME_LEN {
        local
    } else {
        format!("player_{}", user_id)
    }
}

/// 자동 생성 username 충돌 시 후보
///
/// 마지막 시도는 uid를 붙여 충돌 가능성을 없앤다
fn suffixed_username(base: &str, user_id: &str, attempt: u32) -> String {
    if attempt < DERIVED_USERNAME_ATTEMPTS {
        format!("{}{}", base, rand::thread_rng().gen_range(0..1000))
    } else {
        format!("{}_{}", base, user_id)
    }
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::ValidationError("Username cannot be empty.".to_string()));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ApiError::ValidationError(
            "Username must be at least 3 characters long.".to_string(),
        ));
    }
    Ok(())
}

pub struct ProfileService {
    store: Arc<dyn ArenaRepository>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ArenaRepository>) -> Self {
        Self { store }
    }

    /// 프로필 생성 (이미 있으면 기존 프로필 반환)
    ///
    /// 직접 지정한 username이 중복이면 409. 이메일에서 만든 username이 중복이면
    /// 숫자 suffix를 붙여 다시 시도
    pub async fn provision(&self, user_id: &str, email: &str, input: NewProfile) -> Result<User, ApiError> {
        let (base, derived) = match input.username {
            Some(name) => {
                let name = name.trim().to_string();
                validate_username(&name)?;
                (name, false)
            }
            None => (default_username(email, user_id), true),
        };

        let mut user = User::new_profile(user_id, &base, email, Utc::now());
        user.profile_pic_url = input.profile_pic_url.unwrap_or_default();

        let mut attempt = 0;
        loop {
            match self.store.create_user(&user).await {
                Ok(stored) => {
                    tracing::info!(user_id, username = %stored.username, "profile ready");
                    return Ok(stored);
                }
                Err(StoreError::Duplicate(taken)) if derived && attempt < DERIVED_USERNAME_ATTEMPTS => {
                    attempt += 1;
                    tracing::debug!(user_id, %taken, attempt, "derived username taken");
                    user.username = suffixed_username(&base, user_id, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn update(&self, user_id: &str, update: ProfileUpdate) -> Result<User, ApiError> {
        let username = update.username.trim();
        validate_username(username)?;

        let user = self
            .store
            .update_profile(user_id, username, update.in_game_name.trim())
            .await?;
        Ok(user)
    }

    pub async fn view(&self, user_id: &str) -> Result<ProfileView, ApiError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User".to_string()))?;
        let participations = self.store.participations(user_id).await?;

        Ok(ProfileView {
            user,
            stats: PlayerStats::from_participations(&participations),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use crate::types::Role;

    fn participation(rank: u32, kills: u32, winnings: i64) -> Participant {
        Participant {
            tournament_id: format!("t{}", rank),
            user_id: "u1".to_string(),
            username: "alpha".to_string(),
            in_game_name: "alpha".to_string(),
            join_time: Utc::now(),
            rank,
            kills,
            winnings: Amount::from_major(winnings),
        }
    }

    #[test]
    fn test_stats_from_participations() {
        let stats = PlayerStats::from_participations(&[
            participation(1, 7, 300),
            participation(4, 2, 0),
            participation(0, 0, 0),
        ]);

        assert_eq!(stats.total_matches, 3);
        assert_eq!(stats.total_kills, 9);
        assert_eq!(stats.total_winnings, Amount::from_major(300));
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.win_rate, 33.3);

        assert_eq!(PlayerStats::from_participations(&[]).win_rate, 0.0);
    }

    #[test]
    fn test_default_username() {
        assert_eq!(default_username("Alpha.Wolf@x.io", "u1"), "alphawolf");
        assert_eq!(default_username("ab@x.io", "u1"), "player_u1");
    }

    #[tokio::test]
    async fn test_provision_defaults() {
        let service = ProfileService::new(Arc::new(MemoryDatabase::new()));

        let user = service
            .provision("u1", "alpha@x.io", NewProfile::default())
            .await
            .unwrap();

        assert_eq!(user.username, "alpha");
        assert_eq!(user.wallet_balance, Amount::ZERO);
        assert_eq!(user.role, Role::User);
        assert!(!user.is_banned);
        assert!(user.in_game_name.is_empty());
    }

    #[tokio::test]
    async fn test_provision_shared_local_part_gets_suffix() {
        let service = ProfileService::new(Arc::new(MemoryDatabase::new()));
        let first = service
            .provision("u1", "alpha@x.io", NewProfile::default())
            .await
            .unwrap();
        assert_eq!(first.username, "alpha");

        let second = tokio_test::assert_ok!(
            service
                .provision("u2", "alpha@y.io", NewProfile::default())
                .await
        );
        assert!(second.username.starts_with("alpha"));
        assert_ne!(second.username, "alpha");

        // 재호출은 같은 프로필
        let again = service
            .provision("u2", "alpha@y.io", NewProfile::default())
            .await
            .unwrap();
        assert_eq!(again.username, second.username);
    }

    #[tokio::test]
    async fn test_provision_chosen_username_is_not_rewritten() {
        let service = ProfileService::new(Arc::new(MemoryDatabase::new()));
        service
            .provision("u1", "alpha@x.io", NewProfile::default())
            .await
            .unwrap();

        let chosen = NewProfile {
            username: Some("alpha".to_string()),
            profile_pic_url: None,
        };
        let err = service.provision("u2", "bravo@x.io", chosen).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_last_suffix_uses_user_id() {
        let name = suffixed_username("alpha", "u2", DERIVED_USERNAME_ATTEMPTS);
        assert_eq!(name, "alpha_u2");

        let name = suffixed_username("alpha", "u2", 1);
        let digits = name.strip_prefix("alpha").unwrap();
        assert!(digits.parse::<u32>().unwrap() < 1000);
    }

    #[tokio::test]
    async fn test_update_validates_username() {
        let service = ProfileService::new(Arc::new(MemoryDatabase::new()));
        service
            .provision("u1", "alpha@x.io", NewProfile::default())
            .await
            .unwrap();

        let short = ProfileUpdate {
            username: "ab".to_string(),
            in_game_name: String::new(),
        };
        assert!(matches!(
            service.update("u1", short).await,
            Err(ApiError::ValidationError(_))
        ));

        let ok = ProfileUpdate {
            username: "  alphawolf ".to_string(),
            in_game_name: "AW".to_string(),
        };
        let user = service.update("u1", ok).await.unwrap();
        assert_eq!(user.username, "alphawolf");
        assert_eq!(user.in_game_name, "AW");
    }

    #[tokio::test]
    async fn test_update_rejects_taken_username() {
        let service = ProfileService::new(Arc::new(MemoryDatabase::new()));
        service
            .provision("u1", "alpha@x.io", NewProfile::default())
            .await
            .unwrap();
        service
            .provision("u2", "bravo@x.io", NewProfile::default())
            .await
            .unwrap();

        let err = service
            .update(
                "u2",
                ProfileUpdate {
                    username: "alpha".to_string(),
                    in_game_name: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
