//! Create notification table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Sender and recipient carry no foreign keys: the assistant is not a user row.
        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notification::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Notification::NotificationType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notification::FromUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notification::ToUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notification::Message).text().not_null())
                    .col(ColumnDef::new(Notification::Status).string_len(16))
                    .col(
                        ColumnDef::new(Notification::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notification::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (to_user_id, created_at) for inbox listing
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_to_user_created_at")
                    .table(Notification::Table)
                    .col(Notification::ToUserId)
                    .col(Notification::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (from_user_id, to_user_id) for follow request lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_from_to")
                    .table(Notification::Table)
                    .col(Notification::FromUserId)
                    .col(Notification::ToUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Notification {
    Table,
    Id,
    NotificationType,
    FromUserId,
    ToUserId,
    Message,
    Status,
    IsRead,
    CreatedAt,
}
