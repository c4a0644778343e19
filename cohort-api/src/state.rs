use cohort_catalog::CatalogRepository;
use cohort_order::{
    CatalogAdmin, FulfillmentService, FulfillmentSettings, NotificationDispatcher, PaymentLedger,
    RegistrationRepository,
};
use cohort_store::RedisClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct RateLimit {
    pub redis: Arc<RedisClient>,
    pub per_minute: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub fulfillment: FulfillmentService,
    pub ledger: PaymentLedger,
    pub catalog_admin: CatalogAdmin,
    pub rate_limit: Option<RateLimit>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        settings: FulfillmentSettings,
        auth: AuthConfig,
    ) -> Self {
        Self {
            fulfillment: FulfillmentService::new(catalog.clone(), registrations.clone(), settings),
            ledger: PaymentLedger::new(registrations.clone()),
            catalog_admin: CatalogAdmin::new(catalog, registrations),
            rate_limit: None,
            auth,
        }
    }

    pub fn with_notifications(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.fulfillment = self.fulfillment.with_notifications(dispatcher.clone());
        self.ledger = self.ledger.with_notifications(dispatcher);
        self
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, per_minute: i64) -> Self {
        self.rate_limit = Some(RateLimit { redis, per_minute });
        self
    }
}
