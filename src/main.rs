//! Tournament Arena API Server
//!
//! # Startup
//!
//! ```text
//!   .env ─▶ tracing ─▶ Config::from_env
//!                          │
//!          STORAGE_BACKEND ┼─ postgres ─▶ connect + migrate
//!                          └─ memory   ─▶ MemoryDatabase
//!                          │
//!                          ▼
//!   AppState ─▶ router + TraceLayer + CORS ─▶ axum::serve(0.0.0.0:PORT)
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// 라이브러리에서 가져오기
use tourney_api::{
    config::StorageBackend,
    routes::{self, auth::{USER_EMAIL_HEADER, USER_ID_HEADER}},
    AppState, ArenaRepository, Config, Database, MemoryDatabase,
};

/// 개발 환경에서 허용하는 프론트엔드 origin
const DEV_ORIGINS: [&str; 3] = [
    "http://localhost:5173", // Vite dev server
    "http://localhost:3000",
    "http://127.0.0.1:5173",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,sqlx=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "tourney_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting Tournament Arena API Server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!(environment = ?config.environment, storage = ?config.storage, "📋 Configuration loaded");

    // 저장소 선택
    let store: Arc<dyn ArenaRepository> = match config.storage {
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database_url).await?;
            tracing::info!("🗄️  Database connected");

            db.run_migrations().await?;
            tracing::info!("📦 Migrations completed");
            Arc::new(db)
        }
        StorageBackend::Memory => {
            tracing::warn!("🧪 Using in-memory store, data is lost on restart");
            Arc::new(MemoryDatabase::new())
        }
    };

    let port = config.port;
    let cors = cors_layer(&config);

    // 앱 상태 구성
    let state = AppState::new(store, config);

    // 라우터 + 미들웨어
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // 서버 시작
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🌐 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS 설정
///
/// 프로덕션은 ALLOWED_ORIGINS만, 개발은 localhost 허용
fn cors_layer(config: &Config) -> CorsLayer {
    if config.is_production() {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(USER_ID_HEADER),
                HeaderName::from_static(USER_EMAIL_HEADER),
            ])
    } else {
        let origins: Vec<HeaderValue> = DEV_ORIGINS
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
