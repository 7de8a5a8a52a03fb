pub mod app_config;
pub mod database;
pub mod catalog_repo;
pub mod staging_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use catalog_repo::PgCatalogRepository;
pub use staging_repo::PgStagingRepository;
