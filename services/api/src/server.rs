use crate::cli::ServeArgs;
use crate::infra::{build_mail_transport, AppState};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use intake::config::AppConfig;
use intake::error::AppError;
use intake::telemetry;
use intake::workflows::intake::SubmissionService;
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

    let transport = build_mail_transport(&config.mail, config.environment)?;
    let service = Arc::new(SubmissionService::from_config(
        &config.intake,
        &config.mail,
        transport,
    ));

    let app = with_intake_routes(service.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        submissions_dir = %service.exporter().directory().display(),
        control_field = service.normalizer().control_field(),
        recipients = ?service.dispatcher().recipients(),
        "intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
