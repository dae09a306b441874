use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditEntries::ProductId).uuid().not_null())
                    .col(ColumnDef::new(AuditEntries::Content).text().not_null())
                    .col(ColumnDef::new(AuditEntries::KeyUsed).string().not_null())
                    .col(
                        ColumnDef::new(AuditEntries::ConsumedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AuditEntries::Table)
                    .col(AuditEntries::ProductId)
                    .col(AuditEntries::ConsumedAt)
                    .name("idx_audit_entries_product_consumed_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AuditEntries::Table)
                    .col(AuditEntries::ConsumedAt)
                    .name("idx_audit_entries_consumed_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditEntries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AuditEntries {
    Table,
    Id,
    ProductId,
    Content,
    KeyUsed,
    ConsumedAt,
}
