use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Accounts::Table)
          .if_not_exists()
          .col(ColumnDef::new(Accounts::Id).string().not_null().primary_key())
          .col(
            ColumnDef::new(Accounts::DefaultExpiryType)
              .string()
              .not_null()
              .default("none"),
          )
          .col(ColumnDef::new(Accounts::DefaultExpiryTimeDays).integer().null())
          .col(
            ColumnDef::new(Accounts::DefaultExpiryDownloadLimit)
              .integer()
              .null(),
          )
          .col(
            ColumnDef::new(Accounts::DefaultExpiryDeviceLimit).integer().null(),
          )
          .col(
            ColumnDef::new(Accounts::BuildCount).integer().not_null().default(0),
          )
          .col(
            ColumnDef::new(Accounts::ClaimedCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Accounts::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Accounts::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Accounts {
  Table,
  Id,
  DefaultExpiryType,
  DefaultExpiryTimeDays,
  DefaultExpiryDownloadLimit,
  DefaultExpiryDeviceLimit,
  BuildCount,
  ClaimedCount,
  CreatedAt,
}
