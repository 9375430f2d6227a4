mod cache;
mod config;
mod feeds;
mod upstream;

use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cache::FreshCache;
use crate::config::ServerConfig;
use crate::upstream::{HttpUpstream, Upstream};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub upstream: Arc<dyn Upstream>,
    pub cache: Arc<FreshCache>,
    /// Normalized conflict records served when the live API is unavailable.
    pub conflict_sample: Arc<str>,
}

impl AppState {
    pub fn new(config: ServerConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config: Arc::new(config),
            upstream,
            cache: Arc::new(FreshCache::new()),
            conflict_sample: feeds::bundled_conflict_sample(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(feeds::healthz))
        .route("/api/events/earthquakes", get(feeds::earthquakes))
        .route("/api/events/disasters", get(feeds::disasters))
        .route("/api/events/fires", get(feeds::fires))
        .route("/api/events/conflicts", get(feeds::conflicts))
        .route("/api/events/news", get(feeds::news))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::parse();
    let addr = config.addr;
    if config.acled_credentials().is_none() {
        warn!("ACLED_KEY/ACLED_EMAIL not set; conflicts route serves the bundled sample");
    }

    let client = match reqwest::Client::builder()
        .user_agent(concat!("geo-feeds-proxy/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build HTTP client: {err}");
            return;
        }
    };

    let state = AppState::new(config, Arc::new(HttpUpstream::new(client)));
    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            return;
        }
    };
    info!("feeds proxy listening on http://{addr}");
    if let Err(err) = axum::serve(listener, app).await {
        error!("server stopped: {err}");
    }
}
