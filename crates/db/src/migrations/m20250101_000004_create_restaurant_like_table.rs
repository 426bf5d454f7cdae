//! Create restaurant like table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RestaurantLike::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RestaurantLike::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RestaurantLike::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RestaurantLike::RestaurantId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RestaurantLike::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_restaurant_like_user")
                            .from(RestaurantLike::Table, RestaurantLike::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_restaurant_like_restaurant")
                            .from(RestaurantLike::Table, RestaurantLike::RestaurantId)
                            .to(Restaurant::Table, Restaurant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: a user likes a restaurant at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_restaurant_like_user_restaurant")
                    .table(RestaurantLike::Table)
                    .col(RestaurantLike::UserId)
                    .col(RestaurantLike::RestaurantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RestaurantLike::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RestaurantLike {
    Table,
    Id,
    UserId,
    RestaurantId,
    CreatedAt,
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
