use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StockItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(StockItems::Content).text().not_null())
                    .col(
                        ColumnDef::new(StockItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(StockItems::Table, StockItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Serves the FIFO dequeue: oldest item per product first.
        manager
            .create_index(
                Index::create()
                    .table(StockItems::Table)
                    .col(StockItems::ProductId)
                    .col(StockItems::CreatedAt)
                    .col(StockItems::Id)
                    .name("idx_stock_items_product_fifo")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockItems::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StockItems {
    Table,
    Id,
    ProductId,
    Content,
    CreatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}
