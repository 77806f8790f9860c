use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IpAllowlist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IpAllowlist::IpAddress)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IpAllowlist::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(IpAllowlist::Description).string().null())
                    .col(ColumnDef::new(IpAllowlist::AddedBy).string().not_null())
                    .col(ColumnDef::new(IpAllowlist::ExpiresAt).big_integer().null())
                    .col(ColumnDef::new(IpAllowlist::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(IpAllowlist::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ip_allowlist_active_expires")
                    .table(IpAllowlist::Table)
                    .col(IpAllowlist::IsActive)
                    .col(IpAllowlist::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IpAllowlist::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IpAllowlist {
    Table,
    IpAddress,
    IsActive,
    Description,
    AddedBy,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
