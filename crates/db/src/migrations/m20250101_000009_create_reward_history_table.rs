//! Create reward history table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RewardHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardHistory::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RewardHistory::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardHistory::RestaurantId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardHistory::RewardTitle)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardHistory::PunchesSpent)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardHistory::ClaimedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reward_history_user")
                            .from(RewardHistory::Table, RewardHistory::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reward_history_restaurant")
                            .from(RewardHistory::Table, RewardHistory::RestaurantId)
                            .to(Restaurant::Table, Restaurant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, claimed_at) for history listing
        manager
            .create_index(
                Index::create()
                    .name("idx_reward_history_user_claimed_at")
                    .table(RewardHistory::Table)
                    .col(RewardHistory::UserId)
                    .col(RewardHistory::ClaimedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RewardHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RewardHistory {
    Table,
    Id,
    UserId,
    RestaurantId,
    RewardTitle,
    PunchesSpent,
    ClaimedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Restaurant {
    Table,
    Id,
}
