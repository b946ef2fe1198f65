use json::Value as JsonValue;
use sea_orm::sea_query::Expr;
use serde::Deserialize;

use crate::{
  entity::{Platform, build},
  policy::{self, Columns, Decision, Expiry},
  prelude::*,
  sv, utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewBuild {
  pub platform: Platform,
  pub app_name: String,
  pub version: String,
  pub build_number: String,
  pub file_size: i64,
  pub bundle_id: String,
  /// Falls back to the owner's default policy
  #[serde(default)]
  pub expiry: Option<Expiry>,
  #[serde(default)]
  pub branding: Option<JsonValue>,
}

/// Owner-editable settings, absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub expiry: Option<Expiry>,
  #[serde(default)]
  pub is_enabled: Option<bool>,
  #[serde(default)]
  pub is_deprecated: Option<bool>,
  #[serde(default)]
  pub branding: Option<JsonValue>,
}

pub(crate) fn apply_expiry(build: &mut build::ActiveModel, columns: Columns) {
  build.expiry_type = Set(columns.expiry_type);
  build.expires_at = Set(columns.expires_at);
  build.expiry_time_days = Set(columns.expiry_time_days);
  build.expiry_download_limit = Set(columns.expiry_download_limit);
  build.expiry_device_limit = Set(columns.expiry_device_limit);
}

/// Unsets `is_latest` across one app group of `owner`.
pub(crate) async fn clear_latest<C: ConnectionTrait>(
  db: &C,
  owner: &str,
  bundle_id: &str,
  platform: Platform,
) -> Result<()> {
  build::Entity::update_many()
    .col_expr(build::Column::IsLatest, Expr::value(false))
    .filter(build::Column::Owner.eq(owner))
    .filter(build::Column::BundleId.eq(bundle_id))
    .filter(build::Column::Platform.eq(platform))
    .filter(build::Column::IsLatest.eq(true))
    .exec(db)
    .await?;
  Ok(())
}

/// Loads a build the principal is allowed to manage.
pub(crate) async fn owned<C: ConnectionTrait>(
  db: &C,
  principal: &str,
  id: i32,
) -> Result<build::Model> {
  let build = build::Entity::find_by_id(id)
    .one(db)
    .await?
    .ok_or(Error::BuildNotFound)?;

  if build.owner.as_deref() != Some(principal) {
    warn!("`{principal}` tried to manage build {id}");
    return Err(Error::Forbidden);
  }

  Ok(build)
}

pub struct Build<'a> {
  db: &'a DatabaseConnection,
  defaults: Expiry,
}

impl<'a> Build<'a> {
  pub fn new(db: &'a DatabaseConnection, defaults: Expiry) -> Self {
    Self { db, defaults }
  }

  pub async fn create(
    &self,
    owner: &str,
    new: NewBuild,
    now: DateTime,
  ) -> Result<build::Model> {
    utils::required(&new.version, "version")?;
    utils::required(&new.bundle_id, "bundle_id")?;
    if new.file_size < 0 {
      return Err(Error::validation("file_size must not be negative"));
    }

    let txn = self.db.begin().await?;

    let accounts = sv::Account::new(&txn, self.defaults);
    let account = accounts.get_or_create(owner, now).await?;

    let expiry = match new.expiry {
      Some(expiry) => expiry,
      None => account.default_expiry()?,
    };
    let columns = expiry.resolve(now, now)?;

    clear_latest(&txn, owner, &new.bundle_id, new.platform).await?;

    let mut build = build::ActiveModel {
      id: NotSet,
      owner: Set(Some(owner.to_string())),
      platform: Set(new.platform),
      app_name: Set(new.app_name),
      version: Set(new.version),
      build_number: Set(new.build_number),
      file_size: Set(new.file_size),
      bundle_id: Set(new.bundle_id),
      created_at: Set(now),
      updated_at: Set(now),
      is_enabled: Set(true),
      is_latest: Set(true),
      is_deprecated: Set(false),
      download_count: Set(0),
      unique_devices_count: Set(0),
      install_success_count: Set(0),
      branding: Set(new.branding),
      ..Default::default()
    };
    apply_expiry(&mut build, columns);

    let build = build.insert(&txn).await?;
    accounts.bump(owner, 1, 0).await?;

    txn.commit().await?;

    info!("Build {} ({}) created by `{owner}`", build.id, build.version);
    Ok(build)
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<build::Model>> {
    Ok(build::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn get(&self, id: i32) -> Result<build::Model> {
    self.by_id(id).await?.ok_or(Error::BuildNotFound)
  }

  pub async fn owned(
    &self,
    principal: &str,
    id: i32,
  ) -> Result<build::Model> {
    owned(self.db, principal, id).await
  }

  pub async fn by_owner(&self, owner: &str) -> Result<Vec<build::Model>> {
    let builds = build::Entity::find()
      .filter(build::Column::Owner.eq(owner))
      .order_by_desc(build::Column::CreatedAt)
      .order_by_desc(build::Column::Id)
      .all(self.db)
      .await?;
    Ok(builds)
  }

  pub async fn update_settings(
    &self,
    principal: &str,
    id: i32,
    settings: Settings,
    now: DateTime,
  ) -> Result<build::Model> {
    let build = self.owned(principal, id).await?;
    let created_at = build.created_at;

    let mut active: build::ActiveModel = build.into();

    if let Some(expiry) = settings.expiry {
      // the 30 day window is anchored to creation, not to this edit
      apply_expiry(&mut active, expiry.resolve(created_at, now)?);
    }
    if let Some(enabled) = settings.is_enabled {
      active.is_enabled = Set(enabled);
    }
    if let Some(deprecated) = settings.is_deprecated {
      active.is_deprecated = Set(deprecated);
    }
    if let Some(branding) = settings.branding {
      active.branding = Set(Some(branding));
    }
    active.updated_at = Set(now);

    let build = active.update(self.db).await?;
    debug!("Build {id} settings updated by `{principal}`");

    Ok(build)
  }

  pub async fn set_latest(
    &self,
    principal: &str,
    id: i32,
    now: DateTime,
  ) -> Result<build::Model> {
    let txn = self.db.begin().await?;

    let build = owned(&txn, principal, id).await?;
    clear_latest(&txn, principal, &build.bundle_id, build.platform).await?;

    let build = build::ActiveModel {
      is_latest: Set(true),
      updated_at: Set(now),
      ..build.into()
    }
    .update(&txn)
    .await?;

    txn.commit().await?;
    Ok(build)
  }

  pub async fn evaluate(&self, id: i32, now: DateTime) -> Result<Decision> {
    let build = self.get(id).await?;
    Ok(policy::evaluate(&build.snapshot()?, now))
  }
}
