use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250201_000001_create_catalog_tables::Migration),
            Box::new(m20250201_000002_create_stock_movements_table::Migration),
            Box::new(m20250201_000003_create_stock_counts_tables::Migration),
            Box::new(m20250201_000004_create_transfers_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20250201_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250201_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::AccountId).uuid().not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(ColumnDef::new(Items::Unit).string().not_null())
                        .col(ColumnDef::new(Items::Category).string().null())
                        .col(
                            ColumnDef::new(Items::CostPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Items::MinStockLevel).decimal().null())
                        .col(ColumnDef::new(Items::MaxStockLevel).decimal().null())
                        .col(ColumnDef::new(Items::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Items::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_account_id")
                        .table(Items::Table)
                        .col(Items::AccountId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stores::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Stores::AccountId).uuid().not_null())
                        .col(ColumnDef::new(Stores::Name).string().not_null())
                        .col(ColumnDef::new(Stores::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stores_account_id")
                        .table(Stores::Table)
                        .col(Stores::AccountId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Items {
        Table,
        Id,
        AccountId,
        Name,
        Unit,
        Category,
        CostPrice,
        MinStockLevel,
        MaxStockLevel,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Stores {
        Table,
        Id,
        AccountId,
        Name,
        CreatedAt,
    }
}

mod m20250201_000002_create_stock_movements_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250201_000002_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::AccountId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::StoreId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .text()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Reason).string().null())
                        .col(ColumnDef::new(StockMovements::Notes).string().null())
                        .col(ColumnDef::new(StockMovements::ReferenceId).uuid().null())
                        .col(ColumnDef::new(StockMovements::ReferenceType).text().null())
                        .col(
                            ColumnDef::new(StockMovements::CostPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockMovements::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The ledger is read by (item, store) pair and by reference
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_item_store")
                        .table(StockMovements::Table)
                        .col(StockMovements::AccountId)
                        .col(StockMovements::ItemId)
                        .col(StockMovements::StoreId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_reference")
                        .table(StockMovements::Table)
                        .col(StockMovements::ReferenceId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_created_at")
                        .table(StockMovements::Table)
                        .col(StockMovements::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockMovements {
        Table,
        Id,
        AccountId,
        ItemId,
        StoreId,
        Quantity,
        MovementType,
        Reason,
        Notes,
        ReferenceId,
        ReferenceType,
        CostPrice,
        CreatedBy,
        CreatedAt,
    }
}

mod m20250201_000003_create_stock_counts_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250201_000003_create_stock_counts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockCounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockCounts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockCounts::AccountId).uuid().not_null())
                        .col(ColumnDef::new(StockCounts::StoreId).uuid().not_null())
                        .col(ColumnDef::new(StockCounts::UserId).uuid().not_null())
                        .col(ColumnDef::new(StockCounts::Name).string().null())
                        .col(ColumnDef::new(StockCounts::Status).text().not_null())
                        .col(
                            ColumnDef::new(StockCounts::ItemsCounted)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockCounts::TotalValue).decimal().null())
                        .col(ColumnDef::new(StockCounts::ExpectedValue).decimal().null())
                        .col(
                            ColumnDef::new(StockCounts::DiscrepancyValue)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(StockCounts::Notes).string().null())
                        .col(ColumnDef::new(StockCounts::ApprovedBy).uuid().null())
                        .col(ColumnDef::new(StockCounts::ApprovedAt).timestamp().null())
                        .col(ColumnDef::new(StockCounts::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(StockCounts::CompletedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_counts_account_store")
                        .table(StockCounts::Table)
                        .col(StockCounts::AccountId)
                        .col(StockCounts::StoreId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockEntries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEntries::CountId).uuid().not_null())
                        .col(ColumnDef::new(StockEntries::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockEntries::Quantity).decimal().not_null())
                        .col(ColumnDef::new(StockEntries::UnitCost).decimal().null())
                        .col(
                            ColumnDef::new(StockEntries::ExpectedQuantity)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(StockEntries::Discrepancy).decimal().null())
                        .col(
                            ColumnDef::new(StockEntries::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockEntries::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_entries_count_id")
                        .table(StockEntries::Table)
                        .col(StockEntries::CountId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockEntries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockCounts::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockCounts {
        Table,
        Id,
        AccountId,
        StoreId,
        UserId,
        Name,
        Status,
        ItemsCounted,
        TotalValue,
        ExpectedValue,
        DiscrepancyValue,
        Notes,
        ApprovedBy,
        ApprovedAt,
        CreatedAt,
        CompletedAt,
    }

    #[derive(Iden)]
    enum StockEntries {
        Table,
        Id,
        CountId,
        ItemId,
        Quantity,
        UnitCost,
        ExpectedQuantity,
        Discrepancy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250201_000004_create_transfers_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250201_000004_create_transfers_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transfers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transfers::AccountId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::FromStoreId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::ToStoreId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::Status).text().not_null())
                        .col(ColumnDef::new(Transfers::Notes).string().null())
                        .col(ColumnDef::new(Transfers::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Transfers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Transfers::CompletedAt).timestamp().null())
                        .col(ColumnDef::new(Transfers::CompletedBy).uuid().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_account_status")
                        .table(Transfers::Table)
                        .col(Transfers::AccountId)
                        .col(Transfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferLines::TransferId).uuid().not_null())
                        .col(ColumnDef::new(TransferLines::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(TransferLines::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_lines_transfer_id")
                        .table(TransferLines::Table)
                        .col(TransferLines::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transfers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Transfers {
        Table,
        Id,
        AccountId,
        FromStoreId,
        ToStoreId,
        Status,
        Notes,
        CreatedBy,
        CreatedAt,
        CompletedAt,
        CompletedBy,
    }

    #[derive(Iden)]
    enum TransferLines {
        Table,
        Id,
        TransferId,
        ItemId,
        Quantity,
    }
}
