use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(nexus_stock_migration::Migrator).await;
}
