use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CsrfTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CsrfTokens::TokenHash)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CsrfTokens::UserId).string().not_null())
                    .col(ColumnDef::new(CsrfTokens::ExpiresAt).big_integer().not_null())
                    .col(ColumnDef::new(CsrfTokens::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Create index on expires_at for the cleanup sweep
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_csrf_tokens_expires")
                    .table(CsrfTokens::Table)
                    .col(CsrfTokens::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CsrfTokens::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CsrfTokens {
    Table,
    TokenHash,
    UserId,
    ExpiresAt,
    CreatedAt,
}
