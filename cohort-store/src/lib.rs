pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod mailer;
pub mod redis_repo;
pub mod registration_repo;

pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use mailer::WebhookNotifier;
pub use redis_repo::RedisClient;
pub use registration_repo::PgRegistrationRepository;
