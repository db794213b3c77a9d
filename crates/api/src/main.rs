use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valuecard_core::domain::MembershipRow;
use valuecard_core::rank::{RankOptions, ScoredRow};
use valuecard_core::service::error::{LookupError, ScanError};
use valuecard_core::service::{Analyzer, Lookup, SectorSummary};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = valuecard_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let analyzer = match Analyzer::from_settings(&settings) {
        Ok(a) => a,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "failed to build providers");
            return Err(e);
        }
    };

    let state = AppState {
        analyzer: Arc::new(analyzer),
        defaults: settings.rank_options(),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/lookup", get(lookup))
        .route("/membership", get(membership))
        .route("/sectors", get(sectors))
        .route("/scan", get(scan))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    analyzer: Arc<Analyzer>,
    defaults: RankOptions,
}

#[derive(Debug, Deserialize)]
struct LookupParams {
    q: String,
}

async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<Lookup>, StatusCode> {
    state
        .analyzer
        .lookup(&params.q)
        .await
        .map(Json)
        .map_err(|e| lookup_status(&e))
}

async fn membership(
    State(state): State<AppState>,
) -> Result<Json<Vec<MembershipRow>>, StatusCode> {
    let rows = state
        .analyzer
        .membership()
        .await
        .map_err(|e| scan_status(&e))?;
    Ok(Json(rows.to_vec()))
}

async fn sectors(State(state): State<AppState>) -> Result<Json<Vec<SectorSummary>>, StatusCode> {
    state
        .analyzer
        .sectors()
        .await
        .map(Json)
        .map_err(|e| scan_status(&e))
}

#[derive(Debug, Deserialize)]
struct ScanParams {
    sector: Option<String>,
    limit: Option<usize>,
    top: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ApiScan {
    sector: Option<String>,
    items: Vec<ScoredRow>,
}

async fn scan(
    State(state): State<AppState>,
    Query(params): Query<ScanParams>,
) -> Result<Json<ApiScan>, StatusCode> {
    let opts = scan_options(&state.defaults, &params)?;
    let sector = params.sector.filter(|s| !s.trim().is_empty());

    let items = state
        .analyzer
        .scan(sector.as_deref(), &opts)
        .await
        .map_err(|e| scan_status(&e))?;

    Ok(Json(ApiScan { sector, items }))
}

fn scan_options(defaults: &RankOptions, params: &ScanParams) -> Result<RankOptions, StatusCode> {
    let mut opts = defaults.clone();
    if let Some(limit) = params.limit {
        opts.limit = Some(limit);
    }
    if let Some(top) = params.top {
        if top == 0 {
            return Err(StatusCode::BAD_REQUEST);
        }
        opts.top = top;
    }
    Ok(opts)
}

fn lookup_status(err: &LookupError) -> StatusCode {
    match err {
        LookupError::EmptyQuery => StatusCode::BAD_REQUEST,
        LookupError::DataUnavailable { .. } => StatusCode::NOT_FOUND,
    }
}

fn scan_status(err: &ScanError) -> StatusCode {
    match err {
        ScanError::EmptyMembership => StatusCode::SERVICE_UNAVAILABLE,
        ScanError::UnknownSector(_) => StatusCode::NOT_FOUND,
        ScanError::NoData => StatusCode::BAD_GATEWAY,
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &valuecard_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
