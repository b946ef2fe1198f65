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
          .table(AnalyticsRecords::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(AnalyticsRecords::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(AnalyticsRecords::EventId)
              .string()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(AnalyticsRecords::BuildId).integer().not_null())
          .col(ColumnDef::new(AnalyticsRecords::ShareLinkId).integer().null())
          .col(
            ColumnDef::new(AnalyticsRecords::DeviceFingerprint)
              .string()
              .not_null(),
          )
          .col(ColumnDef::new(AnalyticsRecords::DeviceType).string().not_null())
          .col(ColumnDef::new(AnalyticsRecords::DeviceModel).string().null())
          .col(ColumnDef::new(AnalyticsRecords::Platform).string().not_null())
          .col(ColumnDef::new(AnalyticsRecords::Country).string().null())
          .col(ColumnDef::new(AnalyticsRecords::City).string().null())
          .col(
            ColumnDef::new(AnalyticsRecords::InstallStatus).string().not_null(),
          )
          .col(
            ColumnDef::new(AnalyticsRecords::InstalledAt).date_time().not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_analytics_records_build")
              .from(AnalyticsRecords::Table, AnalyticsRecords::BuildId)
              .to(Builds::Table, Builds::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_analytics_records_build")
          .table(AnalyticsRecords::Table)
          .col(AnalyticsRecords::BuildId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(AnalyticsRecords::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum AnalyticsRecords {
  Table,
  Id,
  EventId,
  BuildId,
  ShareLinkId,
  DeviceFingerprint,
  DeviceType,
  DeviceModel,
  Platform,
  Country,
  City,
  InstallStatus,
  InstalledAt,
}
