//! Neuro Tutor Gateway: HTTP front for the Socratic tutor.
//!
//! Loads `.env` and `TutorConfig`, opens the SQLite session store, and serves the chat API
//! under `api_prefix`. `--verify` prints a configuration report and probes the completion
//! API once instead of starting the server.

mod error;
mod handlers;
mod session_store;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
    routing::get,
    Json, Router,
};
use neuro_tutor_core::{ChatMessage, CompletionClient, ResponseOrchestrator, TutorConfig};
use session_store::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_DESCRIPTION: &str = "AI tutor backend specialized for neurodivergent students";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<TutorConfig>,
    pub(crate) store: Arc<SessionStore>,
    pub(crate) orchestrator: Arc<ResponseOrchestrator>,
}

#[tokio::main]
async fn main() {
    // Load .env first so OPENROUTER_API_KEY and NEURO_TUTOR__* reach TutorConfig::load.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[neuro-tutor-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match TutorConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("[neuro-tutor-gateway] configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify(&config).await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("VERIFY FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    if !config.api_key_configured() {
        tracing::warn!(
            "OPENROUTER_API_KEY is not configured; chat replies will use the fallback message"
        );
    }

    let store = match SessionStore::new(PathBuf::from(&config.database_path)) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!(
                "[neuro-tutor-gateway] cannot open session store at {}: {}",
                config.database_path, e
            );
            std::process::exit(1);
        }
    };

    let state = AppState {
        orchestrator: Arc::new(ResponseOrchestrator::new(&config)),
        store,
        config: Arc::clone(&config),
    };
    let app = build_app(state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr()).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[neuro-tutor-gateway] cannot bind {}: {}", config.bind_addr(), e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        app = %config.app_name,
        version = %config.app_version,
        addr = %config.bind_addr(),
        model = %config.default_model,
        debug = config.debug,
        "starting up"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }
    tracing::info!("{} shutting down", config.app_name);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

fn build_app(state: AppState) -> Router {
    let prefix = state.config.api_prefix.trim_end_matches('/').to_string();
    let cors = cors_layer(&state.config.cors_origins);

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health));
    let router = if prefix.is_empty() {
        router.merge(handlers::chat::router())
    } else {
        router.nest(&prefix, handlers::chat::router())
    };

    router
        .with_state(state)
        .layer(cors)
        .layer(axum::middleware::from_fn(log_request))
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = std::time::Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn root(axum::extract::State(state): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": state.config.app_name,
        "version": state.config.app_version,
        "description": SERVICE_DESCRIPTION,
        "health": "OK",
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.app_name,
        "version": state.config.app_version,
    }))
}

/// Pre-flight: report configuration and, when a key is present, run one probe completion.
async fn run_verify(config: &TutorConfig) -> Result<(), String> {
    println!("--- NEURO TUTOR VERIFY ---");
    println!("Endpoint:      {}/chat/completions", config.api_base_url.trim_end_matches('/'));
    println!("Default model: {}", config.default_model);
    println!("Timeout:       {}s", config.request_timeout_secs);
    println!("API key:       {}", config.masked_api_key());
    println!("Database:      {}", config.database_path);

    if !config.api_key_configured() {
        return Err("OPENROUTER_API_KEY is not configured (set it in .env)".to_string());
    }

    let client = CompletionClient::new(config);
    let messages = [
        ChatMessage::new(
            "system",
            "You are a helpful Socratic tutor who guides students through questions.",
        ),
        ChatMessage::new(
            "user",
            "Can you help me understand photosynthesis? I don't know where to start.",
        ),
    ];
    let reply = client
        .call(&messages, &config.default_model, config.default_temperature, 500)
        .await
        .map_err(|e| format!("probe completion failed ({}): {}", e.kind(), e))?;

    println!("Probe completion OK. Sample response:");
    println!("{}", "-".repeat(50));
    println!("{}", reply);
    println!("{}", "-".repeat(50));
    Ok(())
}
