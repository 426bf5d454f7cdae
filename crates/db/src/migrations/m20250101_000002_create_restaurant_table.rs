//! Create restaurant table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Restaurant::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Restaurant::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Restaurant::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Restaurant::Latitude).double())
                    .col(ColumnDef::new(Restaurant::Longitude).double())
                    .col(ColumnDef::new(Restaurant::Total).integer())
                    .col(
                        ColumnDef::new(Restaurant::ActiveRewards)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Restaurant::NfcTagId)
                            .string_len(128)
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Restaurant::LogoUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Restaurant::LikesCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Restaurant::ViewsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Restaurant::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(
                        Expr::col(Restaurant::Total)
                            .gt(0)
                            .or(Expr::col(Restaurant::Total).is_null()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Restaurant::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Restaurant {
    Table,
    Id,
    Name,
    Latitude,
    Longitude,
    Total,
    ActiveRewards,
    NfcTagId,
    LogoUrl,
    LikesCount,
    ViewsCount,
    CreatedAt,
}
