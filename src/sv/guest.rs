use sea_orm::sea_query::Expr;
use serde::Deserialize;

use crate::{
  entity::{ExpiryType, Platform, build, guest_upload},
  policy::Expiry,
  prelude::*,
  sv::{
    self,
    build::{apply_expiry, clear_latest},
  },
  utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewUpload {
  pub device_id: String,
  pub platform: Platform,
  pub file_type: String,
  pub app_name: String,
  pub version: String,
  pub build_number: String,
  pub file_size: i64,
  pub bundle_id: String,
}

pub struct Guest<'a> {
  db: &'a DatabaseConnection,
  defaults: Expiry,
  ttl: TimeDelta,
}

fn by_identifier(identifier: &str) -> Condition {
  let condition =
    Condition::any().add(guest_upload::Column::Token.eq(identifier));

  match identifier.parse::<i32>() {
    Ok(id) => condition.add(guest_upload::Column::Id.eq(id)),
    Err(_) => condition,
  }
}

impl<'a> Guest<'a> {
  pub fn new(
    db: &'a DatabaseConnection,
    defaults: Expiry,
    ttl: TimeDelta,
  ) -> Self {
    Self { db, defaults, ttl }
  }

  /// Stores an anonymous upload. The underlying build gets no owner and a
  /// time policy that ends with the guest TTL.
  pub async fn upload(
    &self,
    new: NewUpload,
    now: DateTime,
  ) -> Result<(guest_upload::Model, build::Model)> {
    utils::required(&new.device_id, "device_id")?;
    utils::required(&new.version, "version")?;
    utils::required(&new.bundle_id, "bundle_id")?;
    if new.file_size < 0 {
      return Err(Error::validation("file_size must not be negative"));
    }

    let expires_at = now + self.ttl;
    let txn = self.db.begin().await?;

    let build = build::ActiveModel {
      id: NotSet,
      owner: Set(None),
      platform: Set(new.platform),
      app_name: Set(new.app_name.clone()),
      version: Set(new.version.clone()),
      build_number: Set(new.build_number),
      file_size: Set(new.file_size),
      bundle_id: Set(new.bundle_id),
      created_at: Set(now),
      updated_at: Set(now),
      is_enabled: Set(true),
      is_latest: Set(false),
      is_deprecated: Set(false),
      expiry_type: Set(ExpiryType::Time),
      expires_at: Set(Some(expires_at)),
      expiry_time_days: Set(None),
      expiry_download_limit: Set(None),
      expiry_device_limit: Set(None),
      download_count: Set(0),
      unique_devices_count: Set(0),
      install_success_count: Set(0),
      branding: Set(None),
    }
    .insert(&txn)
    .await?;

    let upload = guest_upload::ActiveModel {
      id: NotSet,
      build_id: Set(build.id),
      token: Set(utils::token()),
      device_id: Set(new.device_id),
      file_type: Set(new.file_type),
      app_name: Set(new.app_name),
      version: Set(new.version),
      file_size: Set(new.file_size),
      download_count: Set(0),
      expires_at: Set(expires_at),
      claimed_by: Set(None),
      claimed_at: Set(None),
      created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!("Guest upload {} stored as build {}", upload.id, build.id);
    Ok((upload, build))
  }

  pub async fn find(&self, identifier: &str) -> Result<guest_upload::Model> {
    guest_upload::Entity::find()
      .filter(by_identifier(identifier))
      .one(self.db)
      .await?
      .ok_or(Error::UploadNotFound)
  }

  /// Transfers a guest upload to `claimant`, exactly once.
  ///
  /// Any second claim fails with `AlreadyClaimed`, including one by the
  /// account that already holds the upload.
  pub async fn claim(
    &self,
    identifier: &str,
    claimant: &str,
    now: DateTime,
  ) -> Result<build::Model> {
    let txn = self.db.begin().await?;

    let upload = guest_upload::Entity::find()
      .filter(by_identifier(identifier))
      .one(&txn)
      .await?
      .ok_or(Error::UploadNotFound)?;

    if let Some(holder) = &upload.claimed_by {
      warn!(
        "`{claimant}` tried to claim upload {} held by `{holder}`",
        upload.id
      );
      return Err(Conflict::AlreadyClaimed.into());
    }
    if upload.is_expired(now) {
      return Err(Error::Expired);
    }

    let build = build::Entity::find_by_id(upload.build_id)
      .one(&txn)
      .await?
      .ok_or(Error::BuildNotFound)?;

    if build.owner.as_deref().is_some_and(|owner| owner != claimant) {
      return Err(Error::Forbidden);
    }

    // Available -> Claimed, only if nobody moved it first
    let claimed = guest_upload::Entity::update_many()
      .col_expr(
        guest_upload::Column::ClaimedBy,
        Expr::value(claimant.to_string()),
      )
      .col_expr(guest_upload::Column::ClaimedAt, Expr::value(now))
      .filter(guest_upload::Column::Id.eq(upload.id))
      .filter(guest_upload::Column::ClaimedBy.is_null())
      .filter(guest_upload::Column::ExpiresAt.gt(now))
      .exec(&txn)
      .await?;

    if claimed.rows_affected == 0 {
      return Err(Conflict::AlreadyClaimed.into());
    }

    let accounts = sv::Account::new(&txn, self.defaults);
    let account = accounts.get_or_create(claimant, now).await?;
    let columns = account.default_expiry()?.resolve(build.created_at, now)?;

    clear_latest(&txn, claimant, &build.bundle_id, build.platform).await?;

    let mut active: build::ActiveModel = build.into();
    active.owner = Set(Some(claimant.to_string()));
    active.is_latest = Set(true);
    active.updated_at = Set(now);
    apply_expiry(&mut active, columns);
    let build = active.update(&txn).await?;

    accounts.bump(claimant, 1, 1).await?;

    txn.commit().await?;

    info!("Guest upload {} claimed by `{claimant}`", upload.id);
    Ok(build)
  }

  /// Disables builds behind unclaimed uploads whose TTL has elapsed.
  pub async fn sweep(&self, now: DateTime) -> Result<u64> {
    let expired: Vec<i32> = guest_upload::Entity::find()
      .filter(guest_upload::Column::ClaimedBy.is_null())
      .filter(guest_upload::Column::ExpiresAt.lte(now))
      .all(self.db)
      .await?
      .into_iter()
      .map(|upload| upload.build_id)
      .collect();

    if expired.is_empty() {
      return Ok(0);
    }

    let disabled = build::Entity::update_many()
      .col_expr(build::Column::IsEnabled, Expr::value(false))
      .col_expr(build::Column::UpdatedAt, Expr::value(now))
      .filter(build::Column::Id.is_in(expired))
      .filter(build::Column::Owner.is_null())
      .filter(build::Column::IsEnabled.eq(true))
      .exec(self.db)
      .await?;

    Ok(disabled.rows_affected)
  }
}
