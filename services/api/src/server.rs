use crate::cli::ServeArgs;
use crate::infra::{load_seed, wire, AppState};
use crate::routes::with_placement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ojt_placement::config::AppConfig;
use ojt_placement::error::AppError;
use ojt_placement::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let seed = load_seed(&config)?;
    let wiring = wire(&seed, config.placement.clone())?;

    let app = with_placement_routes(wiring.service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        call_timeout_ms = config.placement.call_timeout.as_millis() as u64,
        moa_key = ?config.placement.moa_key,
        "placement service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
