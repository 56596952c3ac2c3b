//! Atelier Commerce - custom-suit marketplace service

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use atelier_commerce::api::{build_app, AppState};
use atelier_commerce::checkout::CheckoutUrls;
use atelier_commerce::config::load_app_config;
use atelier_commerce::db::{self, PoolConfig};
use atelier_commerce::providers::{measurement, payment};
use atelier_commerce::publisher::EventPublisher;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();

    let check = config.pricing.self_check();
    tracing::info!(share_sum = %check.share_sum, commission_rate = %config.pricing.commission_rate, currency = %config.pricing.currency, "pricing self-check");
    config.pricing.validate()?;

    let pool = db::connect_pool(&PoolConfig {
        database_url: config.database_url.clone(),
        max_connections: config.db_max_connections,
        acquire_timeout_secs: config.db_acquire_timeout_secs,
    })
    .await?;
    db::run_migrations(&pool).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable, domain events will only be logged");
                None
            }
        },
        None => None,
    };
    let events = EventPublisher::new(nats);

    let measurement_provider = measurement::build_provider(&config.measurement)?;
    let payment_provider = payment::build_provider(&config.payment)?;
    tracing::info!(measurement = measurement_provider.name(), payment = payment_provider.name(), events = events.is_enabled(), "providers ready");

    let state = AppState::new(
        pool,
        config.pricing.clone(),
        CheckoutUrls::from_base(&config.app_base_url),
        measurement_provider,
        payment_provider,
        events,
    );
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Atelier Commerce listening on {}", config.bind_addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
