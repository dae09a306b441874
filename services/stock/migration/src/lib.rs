use sea_orm_migration::prelude::*;

mod m20261001_000001_create_products;
mod m20261001_000002_create_access_keys;
mod m20261001_000003_create_stock_items;
mod m20261001_000004_create_audit_entries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_products::Migration),
            Box::new(m20261001_000002_create_access_keys::Migration),
            Box::new(m20261001_000003_create_stock_items::Migration),
            Box::new(m20261001_000004_create_audit_entries::Migration),
        ]
    }
}
