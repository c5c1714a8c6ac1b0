//! Create follower table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Follower::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Follower::Id)
                            .string_len(4100)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Follower::FollowerId).string_len(2048).not_null())
                    .col(ColumnDef::new(Follower::FolloweeId).string_len(2048).not_null())
                    .col(
                        ColumnDef::new(Follower::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Follower::FollowId).string_len(2048))
                    .col(
                        ColumnDef::new(Follower::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Follower::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: followee_id (for follower fan-out)
        manager
            .create_index(
                Index::create()
                    .name("idx_follower_followee_id")
                    .table(Follower::Table)
                    .col(Follower::FolloweeId)
                    .to_owned(),
            )
            .await?;

        // Index: follower_id (for deactivation on actor deletion)
        manager
            .create_index(
                Index::create()
                    .name("idx_follower_follower_id")
                    .table(Follower::Table)
                    .col(Follower::FollowerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Follower::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Follower {
    Table,
    Id,
    FollowerId,
    FolloweeId,
    Status,
    FollowId,
    CreatedAt,
    UpdatedAt,
}
