use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditEvents::ActorUserId).string().not_null())
                    .col(ColumnDef::new(AuditEvents::Action).string().not_null())
                    .col(ColumnDef::new(AuditEvents::EntityType).string().not_null())
                    .col(ColumnDef::new(AuditEvents::EntityId).string().null())
                    .col(ColumnDef::new(AuditEvents::Changes).text().null())
                    .col(ColumnDef::new(AuditEvents::IpAddress).string().null())
                    .col(ColumnDef::new(AuditEvents::UserAgent).string().null())
                    .col(ColumnDef::new(AuditEvents::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Time-range queries and the default ordering
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_events_created_at")
                    .table(AuditEvents::Table)
                    .col(AuditEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Investigation: same actor within a window
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_events_actor_created")
                    .table(AuditEvents::Table)
                    .col(AuditEvents::ActorUserId)
                    .col(AuditEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Investigation: same IP within a window
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_events_ip_created")
                    .table(AuditEvents::Table)
                    .col(AuditEvents::IpAddress)
                    .col(AuditEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_events_entity")
                    .table(AuditEvents::Table)
                    .col(AuditEvents::EntityType)
                    .col(AuditEvents::EntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_events_action")
                    .table(AuditEvents::Table)
                    .col(AuditEvents::Action)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuditEvents {
    Table,
    Id,
    ActorUserId,
    Action,
    EntityType,
    EntityId,
    Changes,
    IpAddress,
    UserAgent,
    CreatedAt,
}
