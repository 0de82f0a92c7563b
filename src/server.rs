use crate::cli::ServeArgs;
use crate::infra::{seed_sample_directory, AppState};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use jobportal::config::AppConfig;
use jobportal::error::AppError;
use jobportal::marketplace::{ChatHub, InMemoryMarketplace, Marketplace};
use jobportal::telemetry;
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

    let repository = Arc::new(InMemoryMarketplace::new());
    if args.seed_sample {
        let directory = seed_sample_directory(&repository)?;
        info!(
            seeker = %directory.seeker.user_id,
            provider = %directory.provider.user_id,
            admin = %directory.admin.user_id,
            job = %directory.job,
            "sample accounts loaded"
        );
    }
    let hub = Arc::new(ChatHub::new(config.chat.channel_capacity));
    let marketplace = Arc::new(Marketplace::new(repository, hub));

    let app = with_marketplace_routes(marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "job marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}
