//! Database migrations.
//!
//! Each migration is a separate module following SeaORM conventions.
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_stores_and_users;
mod m20240101_000002_create_catalog_and_stock;
mod m20240101_000003_create_orders;
mod m20240101_000004_create_promotions;
mod m20240101_000005_create_conversations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_stores_and_users::Migration),
            Box::new(m20240101_000002_create_catalog_and_stock::Migration),
            Box::new(m20240101_000003_create_orders::Migration),
            Box::new(m20240101_000004_create_promotions::Migration),
            Box::new(m20240101_000005_create_conversations::Migration),
        ]
    }
}
