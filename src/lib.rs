//! Social Backend - library for app logic and testing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod routes;
pub mod state;
pub mod store;
pub mod upload;
pub mod validation;

#[cfg(test)]
pub mod testing;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::{
    auth::github::GithubProvider,
    config::AppConfig,
    state::AppState,
    store::{MemoryStore, PgStore, Store},
    upload::{cloudinary::CloudinaryStorage, DisabledStorage, MediaStorage},
};

/// Global request body cap; single images are capped separately.
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, else local dev origins.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty())
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("http://127.0.0.1:5173"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();

    Router::new()
        .route("/", get(routes::index::index))
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        // Auth
        .route("/auth/github", get(routes::auth::github_login))
        .route("/auth/github/callback", get(routes::auth::github_callback))
        .route("/auth/guest", post(routes::auth::guest_login))
        .route("/auth/verify", get(routes::auth::verify))
        // Users
        .route("/users", get(routes::users::list_users))
        .route(
            "/users/{userId}",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/users/{userId}/posts", get(routes::users::get_user_posts))
        .route("/users/{userId}/likes", get(routes::users::get_user_likes))
        // Posts
        .route(
            "/posts",
            get(routes::posts::feed).post(routes::posts::create_post),
        )
        .route(
            "/posts/{postId}",
            get(routes::posts::get_post)
                .put(routes::posts::update_post)
                .delete(routes::posts::delete_post),
        )
        .route(
            "/posts/{postId}/comments",
            get(routes::posts::get_post_comments),
        )
        .route("/posts/{postId}/likes", get(routes::posts::get_post_likes))
        // Comments and likes
        .route(
            "/comments",
            post(routes::comments::create_comment).delete(routes::comments::delete_comment),
        )
        .route(
            "/likes",
            post(routes::likes::create_like).delete(routes::likes::delete_like),
        )
        // Follows
        .route("/follow", post(routes::follows::follow))
        .route("/unfollow", delete(routes::follows::unfollow))
        .route("/followers", get(routes::follows::followers))
        .route("/following", get(routes::follows::following))
        // Profiles
        .route("/profile", post(routes::profiles::create_profile))
        .route(
            "/profile/{id}",
            get(routes::profiles::get_profile)
                .put(routes::profiles::update_profile)
                .delete(routes::profiles::delete_profile),
        )
        // Media
        .route("/media", post(routes::media::create_media))
        .route(
            "/media/{mediaId}",
            get(routes::media::get_media).delete(routes::media::delete_media),
        )
        .fallback(error::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(cors)
}

/// Postgres when `DATABASE_URL` is set and reachable, otherwise in-memory.
async fn build_store() -> Arc<dyn Store> {
    if std::env::var("DATABASE_URL").is_err() {
        tracing::warn!("DATABASE_URL not set. Using in-memory store; data is lost on restart.");
        return Arc::new(MemoryStore::new());
    }

    match db::init_pool(None).await {
        Ok(pool) => {
            if let Err(e) = db::run_migrations(&pool).await {
                tracing::error!("Failed to run database migrations: {}", e);
            }
            Arc::new(PgStore::new(pool))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Using in-memory store.",
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_media_storage(config: &AppConfig, client: &reqwest::Client) -> Arc<dyn MediaStorage> {
    match &config.cloudinary {
        Some(cloudinary) => {
            tracing::info!(
                cloud = %cloudinary.cloud_name,
                "Cloudinary media storage enabled; the account must verify SHA-256 signatures"
            );
            Arc::new(CloudinaryStorage::new(cloudinary.clone(), client.clone()))
        }
        None => {
            tracing::warn!("Cloudinary credentials not set. Media uploads are disabled.");
            Arc::new(DisabledStorage)
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Held for the process lifetime so buffered log lines are flushed.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = AppConfig::from_env();
    if let Err(reason) = config.check_production_secrets() {
        tracing::error!("FATAL: {}. Refusing to start.", reason);
        return Err(reason.into());
    }

    let client = reqwest::Client::new();
    let store = build_store().await;
    let media = build_media_storage(&config, &client);
    let identity = Arc::new(GithubProvider::new(config.github.clone(), client));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(store, media, identity, config);
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
