use crate::cli::ServeArgs;
use crate::infra::{build_engine, AppState};
use crate::routes::with_engine_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use creatorlift::config::AppConfig;
use creatorlift::error::AppError;
use creatorlift::telemetry;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (engine, campaigns) = build_engine(config.engine.score_table.clone());
    spawn_deadline_sweeper(
        engine.clone(),
        Duration::from_secs(config.engine.sweep_interval_secs),
    );

    let app = with_engine_routes(engine.clone())
        .layer(Extension(app_state))
        .layer(Extension(engine))
        .layer(Extension(campaigns))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lifecycle engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodic deadline sweep. The maintenance endpoint stays available for
/// out-of-band runs; this covers the steady state.
fn spawn_deadline_sweeper(engine: Arc<crate::infra::ApiEngine>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so startup is quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match engine.sweep(Utc::now()) {
                Ok(actions) if actions.is_empty() => {}
                Ok(actions) => info!(applied = actions.len(), "deadline sweep applied actions"),
                Err(err) => warn!(error = %err, "deadline sweep failed"),
            }
        }
    });
}
