//! Migration: Create warehouses, products, stock levels and the stock ledger.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_stores_and_users::{Stores, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Warehouses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Warehouses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Warehouses::StoreId).uuid().not_null())
                    .col(ColumnDef::new(Warehouses::Name).string().not_null())
                    .col(ColumnDef::new(Warehouses::Location).string().null())
                    .col(
                        ColumnDef::new(Warehouses::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Warehouses::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Warehouses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Warehouses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_warehouses_store")
                            .from(Warehouses::Table, Warehouses::StoreId)
                            .to(Stores::Table, Stores::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Products::StoreId).uuid().not_null())
                    .col(ColumnDef::new(Products::Sku).string().not_null())
                    .col(ColumnDef::new(Products::Barcode).string().null())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Description).text().null())
                    .col(ColumnDef::new(Products::Category).string().null())
                    .col(ColumnDef::new(Products::Price).decimal_len(12, 2).not_null())
                    .col(ColumnDef::new(Products::CostPrice).decimal_len(12, 2).null())
                    .col(
                        ColumnDef::new(Products::StockQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::LowStockThreshold)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Products::Status).string().not_null())
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_store")
                            .from(Products::Table, Products::StoreId)
                            .to(Stores::Table, Stores::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_products_store_sku")
                    .table(Products::Table)
                    .col(Products::StoreId)
                    .col(Products::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_store_barcode")
                    .table(Products::Table)
                    .col(Products::StoreId)
                    .col(Products::Barcode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockLevels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StockLevels::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(StockLevels::StoreId).uuid().not_null())
                    .col(ColumnDef::new(StockLevels::ProductId).uuid().not_null())
                    .col(ColumnDef::new(StockLevels::WarehouseId).uuid().not_null())
                    .col(
                        ColumnDef::new(StockLevels::Quantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(StockLevels::Quantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(StockLevels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_levels_product")
                            .from(StockLevels::Table, StockLevels::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_levels_warehouse")
                            .from(StockLevels::Table, StockLevels::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_stock_levels_product_warehouse")
                    .table(StockLevels::Table)
                    .col(StockLevels::ProductId)
                    .col(StockLevels::WarehouseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StockMovements::StoreId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::WarehouseId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::Delta).integer().not_null())
                    .col(
                        ColumnDef::new(StockMovements::BalanceAfter)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::Kind).string().not_null())
                    .col(ColumnDef::new(StockMovements::Reference).string().null())
                    .col(ColumnDef::new(StockMovements::Note).text().null())
                    .col(ColumnDef::new(StockMovements::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_product")
                            .from(StockMovements::Table, StockMovements::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_user")
                            .from(StockMovements::Table, StockMovements::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_level")
                    .table(StockMovements::Table)
                    .col(StockMovements::ProductId)
                    .col(StockMovements::WarehouseId)
                    .col(StockMovements::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockLevels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Warehouses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum Warehouses {
    Table,
    Id,
    StoreId,
    Name,
    Location,
    IsDefault,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub(super) enum Products {
    Table,
    Id,
    StoreId,
    Sku,
    Barcode,
    Name,
    Description,
    Category,
    Price,
    CostPrice,
    StockQuantity,
    LowStockThreshold,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum StockLevels {
    Table,
    Id,
    StoreId,
    ProductId,
    WarehouseId,
    Quantity,
    UpdatedAt,
}

#[derive(Iden)]
enum StockMovements {
    Table,
    Id,
    StoreId,
    ProductId,
    WarehouseId,
    Delta,
    BalanceAfter,
    Kind,
    Reference,
    Note,
    CreatedBy,
    CreatedAt,
}
