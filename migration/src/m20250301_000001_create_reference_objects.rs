use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReferenceObjects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferenceObjects::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReferenceObjects::WidthCm).double().not_null())
                    .col(ColumnDef::new(ReferenceObjects::HeightCm).double().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReferenceObjects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReferenceObjects {
    Table,
    Name,
    WidthCm,
    HeightCm,
}
