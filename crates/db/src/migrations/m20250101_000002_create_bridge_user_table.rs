//! Create bridge user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BridgeUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BridgeUser::Id)
                            .string_len(2048)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BridgeUser::Protocol).string_len(32).not_null())
                    .col(ColumnDef::new(BridgeUser::ObjId).string_len(2048))
                    .col(ColumnDef::new(BridgeUser::Handle).string_len(256))
                    .col(ColumnDef::new(BridgeUser::Copies).json_binary().not_null())
                    .col(
                        ColumnDef::new(BridgeUser::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BridgeUser::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (protocol, id) - one identity per network
        manager
            .create_index(
                Index::create()
                    .name("idx_bridge_user_protocol_id")
                    .table(BridgeUser::Table)
                    .col(BridgeUser::Protocol)
                    .col(BridgeUser::Id)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: handle (for handle resolution)
        manager
            .create_index(
                Index::create()
                    .name("idx_bridge_user_handle")
                    .table(BridgeUser::Table)
                    .col(BridgeUser::Handle)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BridgeUser::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BridgeUser {
    Table,
    Id,
    Protocol,
    ObjId,
    Handle,
    Copies,
    CreatedAt,
    UpdatedAt,
}
