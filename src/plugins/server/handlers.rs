use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::auth::Principal;
use crate::{
  entity::{account, build, guest_upload, share_link},
  policy::{Decision, Expiry},
  prelude::*,
  state::AppState,
  sv::{
    analytics::Rollup,
    build::{NewBuild, Settings},
    download::{Attempt, InstallRequest},
    guest::NewUpload,
    share::NewLink,
  },
};

type App = State<Arc<AppState>>;

fn now() -> DateTime {
  Utc::now().naive_utc()
}

pub async fn health() -> &'static str {
  "OK"
}

pub async fn create_build(
  State(app): App,
  Principal(owner): Principal,
  Json(new): Json<NewBuild>,
) -> Result<(StatusCode, Json<build::Model>)> {
  let build = app.sv().build.create(&owner, new, now()).await?;
  Ok((StatusCode::CREATED, Json(build)))
}

pub async fn list_builds(
  State(app): App,
  Principal(owner): Principal,
) -> Result<Json<Vec<build::Model>>> {
  Ok(Json(app.sv().build.by_owner(&owner).await?))
}

pub async fn get_build(
  State(app): App,
  Principal(owner): Principal,
  Path(id): Path<i32>,
) -> Result<Json<build::Model>> {
  Ok(Json(app.sv().build.owned(&owner, id).await?))
}

pub async fn update_settings(
  State(app): App,
  Principal(owner): Principal,
  Path(id): Path<i32>,
  Json(settings): Json<Settings>,
) -> Result<Json<build::Model>> {
  let sv = app.sv();
  let build = sv.build.update_settings(&owner, id, settings, now()).await?;
  Ok(Json(build))
}

pub async fn set_latest(
  State(app): App,
  Principal(owner): Principal,
  Path(id): Path<i32>,
) -> Result<Json<build::Model>> {
  Ok(Json(app.sv().build.set_latest(&owner, id, now()).await?))
}

pub async fn access(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<Decision>> {
  Ok(Json(app.sv().build.evaluate(id, now()).await?))
}

pub async fn create_link(
  State(app): App,
  Principal(owner): Principal,
  Path(id): Path<i32>,
  Json(link): Json<NewLink>,
) -> Result<(StatusCode, Json<share_link::Model>)> {
  let link = app.sv().share.create(&owner, id, link, now()).await?;
  Ok((StatusCode::CREATED, Json(link)))
}

pub async fn list_links(
  State(app): App,
  Principal(owner): Principal,
  Path(id): Path<i32>,
) -> Result<Json<Vec<share_link::Model>>> {
  Ok(Json(app.sv().share.by_build(&owner, id).await?))
}

pub async fn analytics(
  State(app): App,
  Principal(owner): Principal,
  Path(id): Path<i32>,
) -> Result<Json<Rollup>> {
  let sv = app.sv();
  sv.build.owned(&owner, id).await?;
  Ok(Json(sv.analytics.rollup(id).await?))
}

impl IntoResponse for Attempt {
  fn into_response(self) -> Response {
    let status = match &self {
      Attempt::Granted { .. } => StatusCode::OK,
      Attempt::Denied { .. } => StatusCode::FORBIDDEN,
    };
    (status, Json(self)).into_response()
  }
}

pub async fn install(
  State(app): App,
  Path(id): Path<i32>,
  Json(request): Json<InstallRequest>,
) -> Result<Attempt> {
  app.sv().download.direct(id, request, now()).await
}

#[derive(Debug, Serialize)]
pub struct LinkView {
  pub link: share_link::Model,
  pub decision: Decision,
}

pub async fn resolve_link(
  State(app): App,
  Path(key): Path<String>,
) -> Result<Json<LinkView>> {
  let sv = app.sv();
  let link = sv.share.resolve(&key).await?;
  let decision = sv.build.evaluate(link.build_id, now()).await?;
  Ok(Json(LinkView { link, decision }))
}

pub async fn install_via_link(
  State(app): App,
  Path(key): Path<String>,
  Json(request): Json<InstallRequest>,
) -> Result<Attempt> {
  app.sv().download.via_link(&key, request, now()).await
}

#[derive(Debug, Serialize)]
pub struct UploadView {
  pub upload: guest_upload::Model,
  pub build: build::Model,
}

pub async fn guest_upload(
  State(app): App,
  Json(new): Json<NewUpload>,
) -> Result<(StatusCode, Json<UploadView>)> {
  let (upload, build) = app.sv().guest.upload(new, now()).await?;
  Ok((StatusCode::CREATED, Json(UploadView { upload, build })))
}

pub async fn guest_status(
  State(app): App,
  Path(identifier): Path<String>,
) -> Result<Json<guest_upload::Model>> {
  Ok(Json(app.sv().guest.find(&identifier).await?))
}

#[derive(Debug, Deserialize)]
pub struct ClaimReq {
  /// Upload id or claim token
  pub identifier: String,
}

pub async fn guest_claim(
  State(app): App,
  Principal(claimant): Principal,
  Json(req): Json<ClaimReq>,
) -> Result<Json<build::Model>> {
  let build = app.sv().guest.claim(&req.identifier, &claimant, now()).await?;
  Ok(Json(build))
}

pub async fn set_defaults(
  State(app): App,
  Principal(id): Principal,
  Json(expiry): Json<Expiry>,
) -> Result<Json<account::Model>> {
  let sv = app.sv();
  let account = sv.account.set_default_expiry(&id, expiry, now()).await?;
  Ok(Json(account))
}
