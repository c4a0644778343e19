use anyhow::Context;
use cohort_api::{app, state::{AppState, AuthConfig}, worker};
use cohort_catalog::expiry::BundleExpirySweeper;
use cohort_catalog::CatalogRepository;
use cohort_core::notification::{LogNotifier, Notifier};
use cohort_order::{InMemoryRegistry, NotificationDispatcher, RegistrationRepository};
use cohort_store::app_config::Config;
use cohort_store::{DbClient, PgCatalogRepository, PgRegistrationRepository, RedisClient, WebhookNotifier};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cohort_api=debug,cohort_order=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Cohort API on port {}", config.server.port);

    let (catalog, registrations): (Arc<dyn CatalogRepository>, Arc<dyn RegistrationRepository>) =
        match &config.database.url {
            Some(url) => {
                let db = DbClient::new(url).await.context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;
                let catalog: Arc<dyn CatalogRepository> = Arc::new(PgCatalogRepository::new(db.pool.clone()));
                let registrations: Arc<dyn RegistrationRepository> =
                    Arc::new(PgRegistrationRepository::new(db.pool.clone()));
                (catalog, registrations)
            }
            None => {
                tracing::warn!("No database configured, keeping all state in memory");
                let registry = Arc::new(InMemoryRegistry::new());
                let catalog: Arc<dyn CatalogRepository> = registry.clone();
                let registrations: Arc<dyn RegistrationRepository> = registry;
                (catalog, registrations)
            }
        };

    let notifier: Arc<dyn Notifier> = match &config.notifications.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
        None => Arc::new(LogNotifier),
    };
    let dispatcher = NotificationDispatcher::new(
        notifier,
        config.notifications.retry_policy(),
        config.notifications.operator_emails.clone(),
    );

    let mut app_state = AppState::new(
        catalog.clone(),
        registrations,
        config.fulfillment.settings(),
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    )
    .with_notifications(dispatcher);

    if let Some(url) = &config.redis.url {
        match RedisClient::new(url).await {
            Ok(redis) => {
                app_state = app_state.with_rate_limit(Arc::new(redis), config.redis.rate_limit_per_minute);
            }
            Err(e) => tracing::warn!("Redis unavailable, rate limiting disabled: {}", e),
        }
    }

    tokio::spawn(worker::start_expiry_worker(
        BundleExpirySweeper::new(catalog),
        Duration::from_secs(config.workers.expiry_sweep_seconds.max(1)),
    ));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
