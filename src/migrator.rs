use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240601_000001_create_genealogy_tables::Migration)]
    }
}

mod m20240601_000001_create_genealogy_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_genealogy_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Parts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Parts::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Parts::PartNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Parts::PartName).string().not_null())
                        .col(ColumnDef::new(Parts::PartType).string().not_null())
                        .col(
                            ColumnDef::new(Parts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Parts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(WorkOrders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(WorkOrders::WorkOrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SerializedParts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SerializedParts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerializedParts::SerialNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(SerializedParts::PartId).uuid().not_null())
                        .col(ColumnDef::new(SerializedParts::LotNumber).string().null())
                        .col(ColumnDef::new(SerializedParts::Status).string().not_null())
                        .col(ColumnDef::new(SerializedParts::WorkOrderId).uuid().null())
                        .col(
                            ColumnDef::new(SerializedParts::ManufactureDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(SerializedParts::CustomerInfo).string().null())
                        .col(ColumnDef::new(SerializedParts::Supplier).string().null())
                        .col(
                            ColumnDef::new(SerializedParts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerializedParts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_serialized_parts_part_id")
                                .from(SerializedParts::Table, SerializedParts::PartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_serialized_parts_work_order_id")
                                .from(SerializedParts::Table, SerializedParts::WorkOrderId)
                                .to(WorkOrders::Table, WorkOrders::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_serialized_parts_lot_number")
                        .table(SerializedParts::Table)
                        .col(SerializedParts::LotNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_serialized_parts_part_id")
                        .table(SerializedParts::Table)
                        .col(SerializedParts::PartId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PartGenealogy::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PartGenealogy::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PartGenealogy::ParentPartId).uuid().not_null())
                        .col(
                            ColumnDef::new(PartGenealogy::ComponentPartId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartGenealogy::AssemblyDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PartGenealogy::AssemblyOperator)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PartGenealogy::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_part_genealogy_parent_part_id")
                                .from(PartGenealogy::Table, PartGenealogy::ParentPartId)
                                .to(SerializedParts::Table, SerializedParts::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_part_genealogy_component_part_id")
                                .from(PartGenealogy::Table, PartGenealogy::ComponentPartId)
                                .to(SerializedParts::Table, SerializedParts::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_part_genealogy_parent_component")
                        .table(PartGenealogy::Table)
                        .col(PartGenealogy::ParentPartId)
                        .col(PartGenealogy::ComponentPartId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_part_genealogy_component_part_id")
                        .table(PartGenealogy::Table)
                        .col(PartGenealogy::ComponentPartId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PartGenealogy::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SerializedParts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Parts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Parts {
        Table,
        Id,
        PartNumber,
        PartName,
        PartType,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WorkOrders {
        Table,
        Id,
        WorkOrderNumber,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SerializedParts {
        Table,
        Id,
        SerialNumber,
        PartId,
        LotNumber,
        Status,
        WorkOrderId,
        ManufactureDate,
        CustomerInfo,
        Supplier,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PartGenealogy {
        Table,
        Id,
        ParentPartId,
        ComponentPartId,
        AssemblyDate,
        AssemblyOperator,
        CreatedAt,
    }
}

/// Applies every pending migration on an open connection.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running database migrations");

    match Migrator::up(db, None).await {
        Ok(()) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e)
        }
    }
}
