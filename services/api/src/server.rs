use crate::infra::{AppState, FeedbackAdapters};
use crate::routes::with_feedback_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use staff_feedback::config::AppConfig;
use staff_feedback::error::AppError;
use staff_feedback::telemetry;
use staff_feedback::workflows::feedback::FeedbackState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = FeedbackAdapters::from_config(&config)?.into_services(&config);
    let feedback_state =
        Arc::new(FeedbackState::new(services).with_idle_ttl(config.sessions.idle_ttl()));

    let app = with_feedback_routes(feedback_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        auth_required = config.auth.required,
        mirror = config.mirror.webhook_url.is_some(),
        "staff feedback service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
