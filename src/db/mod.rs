//! Database Module
//!
//! PostgreSQL 구현 (`Database`)과 in-memory 구현 (`MemoryDatabase`).
//!
//! # Join transaction on PostgreSQL
//!
//! ```text
//! BEGIN ISOLATION LEVEL SERIALIZABLE
//!   SELECT user, tournament, participant      -- snapshot
//!   plan_join()                               -- rules, no I/O
//!   UPDATE users / INSERT transactions        -- fee > 0 only
//!   UPDATE tournaments SET slots_filled
//!   INSERT participants
//! COMMIT
//! ```
//!
//! 직렬화 실패(40001), 데드락(40P01), 참가 기록 PK 충돌(23505)은
//! `StoreError::Conflict`로 바뀌어 서비스 계층에서 처음부터 재시도된다.

mod memory;
mod models;
mod repository;

pub use memory::MemoryDatabase;
pub use models::*;
pub use repository::{ArenaRepository, StoreResult};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

use crate::error::{JoinError, StoreError};
use crate::services::{plan_join, JoinReceipt};
use crate::types::TournamentStatus;

/// PostgreSQL SQLSTATE
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

const USER_COLUMNS: &str = r#"
    id, username, email, in_game_name, wallet_balance,
    role, is_banned, profile_pic_url, created_at
"#;

const TOURNAMENT_COLUMNS: &str = r#"
    id, title, status, entry_fee, prize_pool, slots_total, slots_filled,
    map, mode, start_time, is_approved
"#;

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10 (트래픽에 따라 조정)
    /// - min_connections: 1 (idle 시 최소 유지)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn begin_serializable(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// 스냅샷 읽기 + 쓰기. 에러는 분류 전 원본 그대로
    async fn join_in_tx(
        &self,
        user_id: &str,
        tournament_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<JoinReceipt> {
        let mut tx = self.begin_serializable().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let tournament = sqlx::query_as::<_, Tournament>(&format!(
            "SELECT {} FROM tournaments WHERE id = $1",
            TOURNAMENT_COLUMNS
        ))
        .bind(tournament_id)
        .fetch_optional(&mut *tx)
        .await?;

        let already_joined: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM participants WHERE tournament_id = $1 AND user_id = $2)",
        )
        .bind(tournament_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        // 거절 시 tx는 drop되며 롤백
        let plan = plan_join(user.as_ref(), tournament.as_ref(), already_joined, now)?;
        let entry_fee = tournament
            .as_ref()
            .map(|t| t.entry_fee)
            .ok_or(JoinError::NotFound)?;

        if let Some(entry) = &plan.ledger_entry {
            sqlx::query("UPDATE users SET wallet_balance = $1 WHERE id = $2")
                .bind(plan.balance_after.minor())
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO transactions (id, user_id, amount, type, description, tournament_id, timestamp)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.id)
            .bind(&entry.user_id)
            .bind(entry.amount.minor())
            .bind(&entry.category)
            .bind(&entry.description)
            .bind(&entry.tournament_id)
            .bind(entry.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE tournaments SET slots_filled = $1 WHERE id = $2")
            .bind(plan.slots_filled as i32)
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        let p = &plan.participant;
        sqlx::query(
            r#"
            INSERT INTO participants (
                tournament_id, user_id, username, in_game_name, join_time, rank, kills, winnings
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&p.tournament_id)
        .bind(&p.user_id)
        .bind(&p.username)
        .bind(&p.in_game_name)
        .bind(p.join_time)
        .bind(p.rank as i32)
        .bind(p.kills as i32)
        .bind(p.winnings.minor())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(plan.receipt(entry_fee))
    }
}

/// SQLSTATE 코드 추출
fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

/// 재시도 가능한 충돌인지
fn is_write_conflict(err: &sqlx::Error) -> bool {
    matches!(
        sqlstate(err).as_deref(),
        Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(UNIQUE_VIOLATION)
    )
}

/// username unique 제약 위반이면 Duplicate로 변환
fn map_profile_error(err: sqlx::Error, username: &str) -> StoreError {
    if sqlstate(&err).as_deref() == Some(UNIQUE_VIOLATION) {
        StoreError::Duplicate(username.to_string())
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl ArenaRepository for Database {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: &User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, in_game_name, wallet_balance,
                role, is_banned, profile_pic_url, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.in_game_name)
        .bind(user.wallet_balance.minor())
        .bind(user.role.as_str())
        .bind(user.is_banned)
        .bind(&user.profile_pic_url)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_profile_error(e, &user.username))?;

        self.get_user(&user.id)
            .await?
            .ok_or_else(|| StoreError::Missing("User".to_string()))
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        username: &str,
        in_game_name: &str,
    ) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET username = $1, in_game_name = $2 WHERE id = $3 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(username)
        .bind(in_game_name)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_profile_error(e, username))?;

        user.ok_or_else(|| StoreError::Missing("User".to_string()))
    }

    async fn get_tournament(&self, tournament_id: &str) -> StoreResult<Option<Tournament>> {
        let tournament = sqlx::query_as::<_, Tournament>(&format!(
            "SELECT {} FROM tournaments WHERE id = $1",
            TOURNAMENT_COLUMNS
        ))
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tournament)
    }

    async fn list_tournaments(&self, status: TournamentStatus) -> StoreResult<Vec<Tournament>> {
        let tournaments = sqlx::query_as::<_, Tournament>(&format!(
            "SELECT {} FROM tournaments WHERE status = $1 AND is_approved",
            TOURNAMENT_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(tournaments)
    }

    async fn is_participant(&self, tournament_id: &str, user_id: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM participants WHERE tournament_id = $1 AND user_id = $2)",
        )
        .bind(tournament_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn joined_tournaments(
        &self,
        user_id: &str,
        status: TournamentStatus,
    ) -> StoreResult<Vec<Tournament>> {
        let columns = TOURNAMENT_COLUMNS
            .split(',')
            .map(|c| format!("t.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let tournaments = sqlx::query_as::<_, Tournament>(&format!(
            r#"
            SELECT {}
            FROM tournaments t
            JOIN participants p ON p.tournament_id = t.id
            WHERE p.user_id = $1 AND t.status = $2
            "#,
            columns
        ))
        .bind(user_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(tournaments)
    }

    async fn participations(&self, user_id: &str) -> StoreResult<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT tournament_id, user_id, username, in_game_name, join_time, rank, kills, winnings
            FROM participants
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn try_join(
        &self,
        user_id: &str,
        tournament_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<JoinReceipt> {
        match self.join_in_tx(user_id, tournament_id, now).await {
            Err(StoreError::Database(err)) if is_write_conflict(&err) => {
                tracing::debug!(user_id, tournament_id, sqlstate = ?sqlstate(&err), "join conflict");
                Err(StoreError::Conflict)
            }
            other => other,
        }
    }

    async fn insert_request(&self, request: &WalletRequest) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO requests (
                id, user_id, username, type, amount, transaction_ref, upi_id,
                status, admin_note, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(request.id)
        .bind(&request.user_id)
        .bind(&request.username)
        .bind(request.kind.as_str())
        .bind(request.amount.minor())
        .bind(&request.transaction_ref)
        .bind(&request.upi_id)
        .bind(request.status.as_str())
        .bind(&request.admin_note)
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn transactions_for(&self, user_id: &str) -> StoreResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, user_id, amount, type, description, tournament_id, timestamp
            FROM transactions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn requests_for(&self, user_id: &str) -> StoreResult<Vec<WalletRequest>> {
        let requests = sqlx::query_as::<_, WalletRequest>(
            r#"
            SELECT id, user_id, username, type, amount, transaction_ref, upi_id,
                   status, admin_note, created_at
            FROM requests
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    use sqlx::error::{DatabaseError, ErrorKind};
    use uuid::Uuid;

    use crate::types::Amount;

    /// PostgreSQL이 돌려주는 에러 흉내 (SQLSTATE만 의미 있음)
    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct PgFailure {
        code: &'static str,
        message: &'static str,
    }

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn pg_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgFailure {
            code,
            message: "simulated",
        }))
    }

    #[test]
    fn test_write_conflict_sqlstates() {
        assert!(is_write_conflict(&pg_error(SERIALIZATION_FAILURE)));
        assert!(is_write_conflict(&pg_error(DEADLOCK_DETECTED)));
        assert!(is_write_conflict(&pg_error(UNIQUE_VIOLATION)));

        // check 제약 위반, 비-DB 에러는 재시도 대상 아님
        assert!(!is_write_conflict(&pg_error("23514")));
        assert!(!is_write_conflict(&sqlx::Error::RowNotFound));
        assert!(!is_write_conflict(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn test_profile_unique_violation_is_duplicate() {
        let err = map_profile_error(pg_error(UNIQUE_VIOLATION), "alpha");
        assert!(matches!(err, StoreError::Duplicate(name) if name == "alpha"));

        let err = map_profile_error(pg_error(SERIALIZATION_FAILURE), "alpha");
        assert!(matches!(err, StoreError::Database(_)));
    }

    /// DATABASE_URL=postgres://... cargo test -- --ignored
    #[tokio::test]
    #[ignore = "needs a scratch PostgreSQL in DATABASE_URL"]
    async fn test_postgres_join_commits_atomically() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let db = Database::connect(&url).await.unwrap();
        db.run_migrations().await.unwrap();

        let tag = Uuid::new_v4().simple().to_string();
        let user_id = format!("u_{}", &tag[..12]);
        let tournament_id = format!("t_{}", &tag[..12]);

        let mut user = User::new_profile(&user_id, &user_id, "pg@x.io", Utc::now());
        user.wallet_balance = Amount::from_major(100);
        db.create_user(&user).await.unwrap();

        sqlx::query(
            r#"
            INSERT INTO tournaments (
                id, title, status, entry_fee, prize_pool, slots_total, slots_filled,
                map, mode, start_time, is_approved
            )
            VALUES ($1, 'Erangel Solo', 'Upcoming', $2, 0, 1, 0, 'Erangel', 'Solo', NOW(), TRUE)
            "#,
        )
        .bind(&tournament_id)
        .bind(Amount::from_major(50).minor())
        .execute(&db.pool)
        .await
        .unwrap();

        let receipt = db.try_join(&user_id, &tournament_id, Utc::now()).await.unwrap();
        assert_eq!(receipt.balance_after, Amount::from_major(50));
        assert_eq!(receipt.slots_filled, 1);
        assert!(receipt.transaction_id.is_some());

        // 마지막 slot이 찼으므로 TournamentFull이 AlreadyJoined보다 먼저
        let err = db.try_join(&user_id, &tournament_id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(JoinError::TournamentFull)));

        let stored = db.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.wallet_balance, Amount::from_major(50));
        assert_eq!(db.transactions_for(&user_id).await.unwrap().len(), 1);
        assert!(db.is_participant(&tournament_id, &user_id).await.unwrap());
    }
}
