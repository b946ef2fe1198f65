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
          .table(ShareLinks::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ShareLinks::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(ShareLinks::BuildId).integer().not_null())
          .col(
            ColumnDef::new(ShareLinks::Token).string().not_null().unique_key(),
          )
          .col(
            ColumnDef::new(ShareLinks::ShortId)
              .string()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(ShareLinks::LinkType).string().not_null())
          .col(ColumnDef::new(ShareLinks::Label).string().null())
          .col(ColumnDef::new(ShareLinks::MaxUses).integer().null())
          .col(
            ColumnDef::new(ShareLinks::CurrentUses)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(ShareLinks::UniqueDevices)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(ShareLinks::LastUsedAt).date_time().null())
          .col(
            ColumnDef::new(ShareLinks::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(ShareLinks::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_share_links_build")
              .from(ShareLinks::Table, ShareLinks::BuildId)
              .to(Builds::Table, Builds::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_share_links_build")
          .table(ShareLinks::Table)
          .col(ShareLinks::BuildId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(ShareLinks::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum ShareLinks {
  Table,
  Id,
  BuildId,
  Token,
  ShortId,
  LinkType,
  Label,
  MaxUses,
  CurrentUses,
  UniqueDevices,
  LastUsedAt,
  IsActive,
  CreatedAt,
}
