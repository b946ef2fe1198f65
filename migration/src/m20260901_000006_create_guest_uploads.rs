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
          .table(GuestUploads::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(GuestUploads::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(GuestUploads::BuildId)
              .integer()
              .not_null()
              .unique_key(),
          )
          .col(
            ColumnDef::new(GuestUploads::Token)
              .string()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(GuestUploads::DeviceId).string().not_null())
          .col(ColumnDef::new(GuestUploads::FileType).string().not_null())
          .col(ColumnDef::new(GuestUploads::AppName).string().not_null())
          .col(ColumnDef::new(GuestUploads::Version).string().not_null())
          .col(ColumnDef::new(GuestUploads::FileSize).big_integer().not_null())
          .col(
            ColumnDef::new(GuestUploads::DownloadCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(GuestUploads::ExpiresAt).date_time().not_null())
          .col(ColumnDef::new(GuestUploads::ClaimedBy).string().null())
          .col(ColumnDef::new(GuestUploads::ClaimedAt).date_time().null())
          .col(ColumnDef::new(GuestUploads::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_guest_uploads_build")
              .from(GuestUploads::Table, GuestUploads::BuildId)
              .to(Builds::Table, Builds::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_guest_uploads_expiry")
          .table(GuestUploads::Table)
          .col(GuestUploads::ExpiresAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(GuestUploads::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum GuestUploads {
  Table,
  Id,
  BuildId,
  Token,
  DeviceId,
  FileType,
  AppName,
  Version,
  FileSize,
  DownloadCount,
  ExpiresAt,
  ClaimedBy,
  ClaimedAt,
  CreatedAt,
}
