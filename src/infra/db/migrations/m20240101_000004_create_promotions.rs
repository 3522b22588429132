//! Migration: Create promotions table.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_stores_and_users::Stores;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Promotions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Promotions::StoreId).uuid().not_null())
                    .col(ColumnDef::new(Promotions::Code).string().not_null())
                    .col(ColumnDef::new(Promotions::Name).string().not_null())
                    .col(ColumnDef::new(Promotions::Kind).string().not_null())
                    .col(ColumnDef::new(Promotions::Value).decimal_len(12, 2).not_null())
                    .col(
                        ColumnDef::new(Promotions::MinOrderAmount)
                            .decimal_len(12, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(Promotions::MaxUses).integer().null())
                    .col(
                        ColumnDef::new(Promotions::UsedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Promotions::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::EndsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Promotions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promotions_store")
                            .from(Promotions::Table, Promotions::StoreId)
                            .to(Stores::Table, Stores::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_promotions_store_code")
                    .table(Promotions::Table)
                    .col(Promotions::StoreId)
                    .col(Promotions::Code)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Promotions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Promotions {
    Table,
    Id,
    StoreId,
    Code,
    Name,
    Kind,
    Value,
    MinOrderAmount,
    MaxUses,
    UsedCount,
    StartsAt,
    EndsAt,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
