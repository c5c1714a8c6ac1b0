//! Entity store layer for crossfed.
//!
//! Persists the three records the relay core depends on:
//!
//! - **Canonical objects**: activities and objects in the shared
//!   protocol-agnostic form, with delivery bookkeeping
//! - **Bridge users**: one record per (protocol, native id) actor
//! - **Follower edges**: directed follow relationships with status
//!
//! The core consumes storage exclusively through the trait boundary in
//! [`store`]; [`repositories`] provides the `PostgreSQL`/SeaORM
//! implementation and [`memory`] an in-process one that doubles as the
//! reference implementation of the merge and clone-on-read rules.

pub mod entities;
pub mod memory;
pub mod migrations;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use store::{FollowerStore, ObjectStore, UserStore, merge_objects};

use crossfed_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true);

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
