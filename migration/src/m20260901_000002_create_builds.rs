use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Builds::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Builds::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Builds::Owner).string().null())
          .col(ColumnDef::new(Builds::Platform).string().not_null())
          .col(ColumnDef::new(Builds::AppName).string().not_null())
          .col(ColumnDef::new(Builds::Version).string().not_null())
          .col(ColumnDef::new(Builds::BuildNumber).string().not_null())
          .col(ColumnDef::new(Builds::FileSize).big_integer().not_null())
          .col(ColumnDef::new(Builds::BundleId).string().not_null())
          .col(ColumnDef::new(Builds::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Builds::UpdatedAt).date_time().not_null())
          .col(
            ColumnDef::new(Builds::IsEnabled).boolean().not_null().default(true),
          )
          .col(
            ColumnDef::new(Builds::IsLatest).boolean().not_null().default(false),
          )
          .col(
            ColumnDef::new(Builds::IsDeprecated)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(Builds::ExpiryType)
              .string()
              .not_null()
              .default("none"),
          )
          .col(ColumnDef::new(Builds::ExpiresAt).date_time().null())
          .col(ColumnDef::new(Builds::ExpiryTimeDays).integer().null())
          .col(ColumnDef::new(Builds::ExpiryDownloadLimit).integer().null())
          .col(ColumnDef::new(Builds::ExpiryDeviceLimit).integer().null())
          .col(
            ColumnDef::new(Builds::DownloadCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Builds::UniqueDevicesCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Builds::InstallSuccessCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Builds::Branding).json().null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_builds_app_group")
          .table(Builds::Table)
          .col(Builds::Owner)
          .col(Builds::BundleId)
          .col(Builds::Platform)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Builds::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Builds {
  Table,
  Id,
  Owner,
  Platform,
  AppName,
  Version,
  BuildNumber,
  FileSize,
  BundleId,
  CreatedAt,
  UpdatedAt,
  IsEnabled,
  IsLatest,
  IsDeprecated,
  ExpiryType,
  ExpiresAt,
  ExpiryTimeDays,
  ExpiryDownloadLimit,
  ExpiryDeviceLimit,
  DownloadCount,
  UniqueDevicesCount,
  InstallSuccessCount,
  Branding,
}
