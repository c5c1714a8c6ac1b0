//! Create object table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Object::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Object::Id)
                            .string_len(2048)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Object::Payload).json_binary())
                    .col(ColumnDef::new(Object::SourceProtocol).string_len(32))
                    .col(ColumnDef::new(Object::DeliveredProtocol).string_len(32))
                    .col(
                        ColumnDef::new(Object::Status)
                            .string_len(16)
                            .not_null()
                            .default("new"),
                    )
                    .col(ColumnDef::new(Object::Users).json_binary().not_null())
                    .col(ColumnDef::new(Object::Notify).json_binary().not_null())
                    .col(ColumnDef::new(Object::Feed).json_binary().not_null())
                    .col(ColumnDef::new(Object::Delivered).json_binary().not_null())
                    .col(ColumnDef::new(Object::Failed).json_binary().not_null())
                    .col(ColumnDef::new(Object::Copies).json_binary().not_null())
                    .col(
                        ColumnDef::new(Object::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Object::ObjectType).string_len(64))
                    .col(
                        ColumnDef::new(Object::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Object::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: updated_at (for recent-activity listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_object_updated_at")
                    .table(Object::Table)
                    .col(Object::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: status (for dashboard filtering)
        manager
            .create_index(
                Index::create()
                    .name("idx_object_status")
                    .table(Object::Table)
                    .col(Object::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Object::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Object {
    Table,
    Id,
    Payload,
    SourceProtocol,
    DeliveredProtocol,
    Status,
    Users,
    Notify,
    Feed,
    Delivered,
    Failed,
    Copies,
    Deleted,
    ObjectType,
    CreatedAt,
    UpdatedAt,
}
