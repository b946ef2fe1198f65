use sea_orm_migration::prelude::*;

use super::m20260901_000003_create_share_links::ShareLinks;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(LinkDevices::Table)
          .if_not_exists()
          .col(ColumnDef::new(LinkDevices::LinkId).integer().not_null())
          .col(ColumnDef::new(LinkDevices::Fingerprint).string().not_null())
          .col(ColumnDef::new(LinkDevices::FirstSeenAt).date_time().not_null())
          .primary_key(
            Index::create().col(LinkDevices::LinkId).col(LinkDevices::Fingerprint),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_link_devices_link")
              .from(LinkDevices::Table, LinkDevices::LinkId)
              .to(ShareLinks::Table, ShareLinks::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(LinkDevices::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum LinkDevices {
  Table,
  LinkId,
  Fingerprint,
  FirstSeenAt,
}
