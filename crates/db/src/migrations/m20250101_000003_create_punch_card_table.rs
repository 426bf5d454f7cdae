//! Create punch card table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PunchCard::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PunchCard::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PunchCard::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PunchCard::RestaurantId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PunchCard::Count)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PunchCard::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(PunchCard::Count).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_punch_card_user")
                            .from(PunchCard::Table, PunchCard::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_punch_card_restaurant")
                            .from(PunchCard::Table, PunchCard::RestaurantId)
                            .to(Restaurant::Table, Restaurant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, restaurant_id), the conflict target of the capped upsert
        manager
            .create_index(
                Index::create()
                    .name("idx_punch_card_user_restaurant")
                    .table(PunchCard::Table)
                    .col(PunchCard::UserId)
                    .col(PunchCard::RestaurantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PunchCard::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PunchCard {
    Table,
    Id,
    UserId,
    RestaurantId,
    Count,
    UpdatedAt,
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
