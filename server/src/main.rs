use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, Method};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod gateway;
mod media;
mod protocol;
mod registry;
mod room;

use config::ServerConfig;
use error::ServerError;
use media::MediaStore;
use protocol::VideoDescriptor;
use registry::RoomRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<RoomRegistry>,
    pub media: Arc<MediaStore>,
}

fn print_banner(port: u16) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("  ╭─────────────────────────────────────────╮");
    println!("  │                                         │");
    println!("  │   ▶  L O C K S T E P   S E R V E R      │");
    println!("  │      One Room, One Timeline             │");
    println!("  │                                         │");
    println!("  ├─────────────────────────────────────────┤");
    println!("  │                                         │");
    println!("  │   Version:    {:<25} │", version);
    println!("  │   Port:       {:<25} │", port);
    println!("  │   Status:     Ready                     │");
    println!("  │                                         │");
    println!("  ├─────────────────────────────────────────┤");
    println!("  │                                         │");
    println!("  │   Endpoints:                            │");
    println!("  │     • ws://localhost:{:<5}/ws           │", port);
    println!("  │     • POST /api/upload                  │");
    println!("  │     • GET  /api/video/:key              │");
    println!("  │     • GET  /api/room/:code              │");
    println!("  │     • /healthz (health check)           │");
    println!("  │                                         │");
    println!("  ╰─────────────────────────────────────────╯");
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockstep_server=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = ServerConfig::from_env();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    print_banner(config.port);

    let media = MediaStore::new(config.uploads_dir.clone(), config.max_upload_bytes).await?;
    let state = AppState {
        registry: Arc::new(RoomRegistry::new(config.chat_cap, config.chat_join_slice)),
        media: Arc::new(media),
        config: Arc::new(config),
    };

    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
        ]);

    // Multipart framing needs a little room on top of the payload cap.
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(64 * 1024)
        .min(usize::MAX as u64) as usize;

    Router::new()
        .route("/healthz", get(health_check))
        .route("/ws", get(gateway::ws_endpoint))
        .route("/api/upload", post(media::upload))
        .route("/api/video/:key", get(media::stream))
        .route("/api/room/:code", get(room_info))
        .route("/api/admin/storage", get(media::admin_storage))
        .route("/api/admin/cleanup", delete(media::admin_cleanup))
        .route("/api/admin/cleanup-all", delete(media::admin_cleanup_all))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomInfo {
    code: String,
    user_count: usize,
    current_video: Option<VideoDescriptor>,
    created_at: u64,
}

async fn room_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomInfo>, ServerError> {
    let code = RoomRegistry::normalize_code(&code)
        .ok_or_else(|| ServerError::NotFound(format!("No room {}", code)))?;
    let arc = state
        .registry
        .get(&code)
        .ok_or_else(|| ServerError::NotFound(format!("No room {}", code)))?;
    let room = arc.lock().await;
    if room.is_defunct() {
        return Err(ServerError::NotFound(format!("No room {}", code)));
    }
    Ok(Json(RoomInfo {
        code: room.code().to_string(),
        user_count: room.user_count(),
        current_video: room.current_video().cloned(),
        created_at: room.created_at(),
    }))
}
