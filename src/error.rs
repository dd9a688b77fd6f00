//! Error Types
//!
//! ```text
//!   JoinError ──▶ StoreError ──▶ ApiError ──▶ HTTP response
//!   (rules)       (repository)   (status + code)
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 참가 트랜잭션의 비즈니스 규칙 위반
///
/// 여러 조건이 동시에 해당되면 선언 순서대로 첫 번째가 보고됨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("User or Tournament data not found.")]
    NotFound,

    #[error("Insufficient wallet balance.")]
    InsufficientFunds,

    #[error("Tournament is full.")]
    TournamentFull,

    #[error("You have already joined this tournament.")]
    AlreadyJoined,

    #[error("This tournament is not open for joining.")]
    NotJoinable,
}

impl JoinError {
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::NotFound => "NOT_FOUND",
            JoinError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            JoinError::TournamentFull => "TOURNAMENT_FULL",
            JoinError::AlreadyJoined => "ALREADY_JOINED",
            JoinError::NotJoinable => "NOT_JOINABLE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            JoinError::NotFound => StatusCode::NOT_FOUND,
            JoinError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            JoinError::TournamentFull | JoinError::AlreadyJoined | JoinError::NotJoinable => {
                StatusCode::CONFLICT
            }
        }
    }
}

/// Repository 계층 에러
#[derive(Debug, Error)]
pub enum StoreError {
    /// 비즈니스 규칙 위반 (재시도하지 않음)
    #[error(transparent)]
    Rejected(#[from] JoinError),

    /// 동시 쓰기 충돌. 같은 시도를 처음부터 다시 실행하면 됨
    #[error("write conflict")]
    Conflict,

    /// 재시도 한도 소진
    #[error("store busy after {attempts} attempts")]
    Busy { attempts: u32 },

    /// unique 제약 위반 (예: username)
    #[error("duplicate value: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    Missing(String),

    /// 저장된 값이 도메인 타입으로 해석되지 않음
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

/// 컬럼 디코딩 실패(알 수 없는 status 문자열, 음수 slot 등)는 Corrupt,
/// 나머지는 Database
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { index, source } => {
                StoreError::Corrupt(format!("column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => StoreError::Corrupt(source.to_string()),
            other => StoreError::Database(other),
        }
    }
}

/// HTTP 응답으로 나가는 에러
///
/// 5xx는 로그에만 상세 내용을 남기고 응답 본문은 고정 문구
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ============ 401 Unauthorized ============
    #[error("Authentication required")]
    Unauthorized,

    // ============ 404 Not Found ============
    #[error("Resource not found: {0}")]
    NotFound(String),

    // ============ 402 / 404 / 409 참가 거절 ============
    #[error(transparent)]
    JoinRejected(#[from] JoinError),

    // ============ 409 Conflict ============
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ 500 Internal Server Error ============
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    InternalError,

    // ============ 503 Service Unavailable ============
    #[error("Store busy after {0} attempts")]
    StoreBusy(u32),
}

/// 에러 응답 본문
///
/// `details`에는 참가 거절 사유 코드 등 부가 정보
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// 응답에 실릴 (status, code, message, details)
    fn parts(&self) -> (StatusCode, &'static str, String, Option<String>) {
        match self {
            // 4xx 클라이언트 에러
            ApiError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
                None,
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
                None,
            ),
            ApiError::JoinRejected(reason) => (
                reason.status(),
                "JOIN_REJECTED",
                reason.to_string(),
                Some(reason.code().to_string()),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),

            // 5xx 서버 에러
            ApiError::DatabaseError(_) => {
                // 내부 에러는 클라이언트에 상세 정보 노출 안 함
                tracing::error!("Database error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                    None,
                )
            }
            ApiError::InternalError => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::StoreBusy(attempts) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_BUSY",
                "The wallet is busy, please try again.".to_string(),
                Some(format!("gave up after {} attempts", attempts)),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Repository 에러를 ApiError로 변환
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(reason) => ApiError::JoinRejected(reason),
            StoreError::Busy { attempts } => ApiError::StoreBusy(attempts),
            // 재시도 루프 밖으로 새어 나온 충돌
            StoreError::Conflict => ApiError::StoreBusy(1),
            StoreError::Duplicate(_) => {
                ApiError::Conflict("The username might already be taken.".to_string())
            }
            StoreError::Missing(what) => ApiError::NotFound(what),
            StoreError::Corrupt(msg) => {
                tracing::error!("Corrupt record: {}", msg);
                ApiError::InternalError
            }
            StoreError::Database(err) => {
                tracing::error!("SQLx error: {:?}", err);
                ApiError::DatabaseError(err.to_string())
            }
        }
    }
}

/// anyhow 에러를 ApiError로 변환
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Anyhow error: {:?}", err);
        ApiError::InternalError
    }
}
