use crate::cli::ServeArgs;
use crate::infra::{seeded_back_office, AppState};
use crate::routes::with_console_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use edu_console::billing::BillingService;
use edu_console::config::AppConfig;
use edu_console::crm::StudentRelationshipService;
use edu_console::error::AppError;
use edu_console::telemetry;
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

    let office = Arc::new(seeded_back_office());
    let students = Arc::new(StudentRelationshipService::new(
        office.clone(),
        office.clone(),
        office.clone(),
        office.clone(),
    ));
    let billing = Arc::new(BillingService::new(
        office.clone(),
        office,
        &config.billing,
        config.issuer.clone(),
    )?);

    let app = with_console_routes(students, billing)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "education console ready");

    axum::serve(listener, app).await?;
    Ok(())
}
