use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::http::Method;
use chrono::Duration;
use clap::Parser;
use feedlizer::articles::ArticleCache;
use feedlizer::clock::{Clock, SystemClock};
use feedlizer::config::{Cli, Config, default_config_path};
use feedlizer::dedup::IdempotencyCache;
use feedlizer::feedly::FeedlyClient;
use feedlizer::handler::{AppState, router};
use feedlizer::instapaper::InstapaperClient;
use feedlizer::session::SessionStore;
use tokio::{signal, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    let config_path = args
        .config_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(default_config_path);

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    tracing::info!("feedlizer.svc starting");

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });

    let http = reqwest::Client::builder()
        .connect_timeout(StdDuration::from_secs(10))
        .timeout(StdDuration::from_secs(cfg.app.request_timeout_seconds))
        .user_agent("Feedlizer/1.0")
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build http client");
            std::process::exit(1);
        });

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let instapaper = Arc::new(InstapaperClient::new(&cfg.instapaper, http.clone(), clock.clone()));
    if !instapaper.is_configured() {
        tracing::warn!("instapaper credentials missing, saving to instapaper is disabled");
    }
    if cfg.feedly.get_token().is_none() {
        tracing::warn!("feedly token missing, feed requests will fail");
    }

    let dedup = Arc::new(IdempotencyCache::with_clock(
        Duration::milliseconds(cfg.app.dedup_window_ms),
        clock.clone(),
    ));
    let sessions = Arc::new(SessionStore::new(cfg.app.get_password(), clock.clone()));
    let state = AppState {
        feed: Arc::new(FeedlyClient::new(&cfg.feedly, http)),
        instapaper,
        dedup: dedup.clone(),
        articles: Arc::new(ArticleCache::new(
            Duration::seconds(cfg.app.article_cache_seconds),
            clock,
        )),
        sessions: sessions.clone(),
        stream_count: cfg.feedly.stream_count,
    };

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let cancellation_token = CancellationToken::new();
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel::<()>(1);

    // Expired dedup fingerprints and sessions are also dropped on access;
    // this keeps idle maps from growing.
    let sweep_token = cancellation_token.clone();
    let sweep_done = shutdown_complete_tx.clone();
    tokio::spawn(async move {
        let _done = sweep_done;
        let mut interval = tokio::time::interval(StdDuration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let fingerprints = dedup.sweep();
                    let expired = sessions.sweep();
                    if fingerprints > 0 || expired > 0 {
                        tracing::debug!(fingerprints, sessions = expired, "swept expired entries");
                    }
                }
                _ = sweep_token.cancelled() => {
                    tracing::info!("sweeper task shutting down");
                    break;
                }
            }
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("feedlizer.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server exited with error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
            cancellation_token.cancel();
        }
    }

    drop(shutdown_complete_tx);
    shutdown_complete_rx.recv().await;
    tracing::info!("feedlizer.svc going off, graceful shutdown complete");
}
