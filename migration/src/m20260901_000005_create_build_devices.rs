use sea_orm_migration::prelude::*;

use super::m20260901_000002_create_builds::Builds;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(BuildDevices::Table)
          .if_not_exists()
          .col(ColumnDef::new(BuildDevices::BuildId).integer().not_null())
          .col(ColumnDef::new(BuildDevices::Fingerprint).string().not_null())
          .col(ColumnDef::new(BuildDevices::FirstSeenAt).date_time().not_null())
          .primary_key(
            Index::create()
              .col(BuildDevices::BuildId)
              .col(BuildDevices::Fingerprint),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_build_devices_build")
              .from(BuildDevices::Table, BuildDevices::BuildId)
              .to(Builds::Table, Builds::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(BuildDevices::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum BuildDevices {
  Table,
  BuildId,
  Fingerprint,
  FirstSeenAt,
}
