use sea_orm::sea_query::{Expr, OnConflict};

use crate::{entity::account, policy::Expiry, prelude::*};

pub struct Account<'a, C = DatabaseConnection> {
  db: &'a C,
  defaults: Expiry,
}

impl<'a, C: ConnectionTrait> Account<'a, C> {
  pub fn new(db: &'a C, defaults: Expiry) -> Self {
    Self { db, defaults }
  }

  pub async fn by_id(&self, id: &str) -> Result<Option<account::Model>> {
    Ok(account::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn get_or_create(
    &self,
    id: &str,
    now: DateTime,
  ) -> Result<account::Model> {
    if let Some(account) = self.by_id(id).await? {
      return Ok(account);
    }

    let columns = self.defaults.resolve(now, now)?;
    let account = account::ActiveModel {
      id: Set(id.to_string()),
      default_expiry_type: Set(columns.expiry_type),
      default_expiry_time_days: Set(columns.expiry_time_days),
      default_expiry_download_limit: Set(columns.expiry_download_limit),
      default_expiry_device_limit: Set(columns.expiry_device_limit),
      build_count: Set(0),
      claimed_count: Set(0),
      created_at: Set(now),
    };

    // another request may have registered the same principal meanwhile
    account::Entity::insert(account)
      .on_conflict(
        OnConflict::column(account::Column::Id).do_nothing().to_owned(),
      )
      .exec_without_returning(self.db)
      .await?;

    info!("Registered account `{id}`");

    self
      .by_id(id)
      .await?
      .ok_or_else(|| Error::Internal(format!("account `{id}` vanished")))
  }

  pub async fn set_default_expiry(
    &self,
    id: &str,
    expiry: Expiry,
    now: DateTime,
  ) -> Result<account::Model> {
    let columns = expiry.resolve(now, now)?;
    let account = self.get_or_create(id, now).await?;

    let account = account::ActiveModel {
      default_expiry_type: Set(columns.expiry_type),
      default_expiry_time_days: Set(columns.expiry_time_days),
      default_expiry_download_limit: Set(columns.expiry_download_limit),
      default_expiry_device_limit: Set(columns.expiry_device_limit),
      ..account.into()
    }
    .update(self.db)
    .await?;

    Ok(account)
  }

  pub async fn bump(&self, id: &str, builds: i32, claimed: i32) -> Result<()> {
    use account::Column;

    account::Entity::update_many()
      .col_expr(Column::BuildCount, Expr::col(Column::BuildCount).add(builds))
      .col_expr(
        Column::ClaimedCount,
        Expr::col(Column::ClaimedCount).add(claimed),
      )
      .filter(Column::Id.eq(id))
      .exec(self.db)
      .await?;

    Ok(())
  }
}
