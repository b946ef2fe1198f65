mod auth;
mod handlers;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
  Router,
  routing::{get, patch, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub fn router(app: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route(
      "/api/builds",
      post(handlers::create_build).get(handlers::list_builds),
    )
    .route("/api/builds/{id}", get(handlers::get_build))
    .route("/api/builds/{id}/settings", patch(handlers::update_settings))
    .route("/api/builds/{id}/latest", post(handlers::set_latest))
    .route("/api/builds/{id}/access", get(handlers::access))
    .route(
      "/api/builds/{id}/links",
      post(handlers::create_link).get(handlers::list_links),
    )
    .route("/api/builds/{id}/analytics", get(handlers::analytics))
    .route("/api/builds/{id}/install", post(handlers::install))
    .route("/api/links/{token}", get(handlers::resolve_link))
    .route("/api/links/{token}/install", post(handlers::install_via_link))
    .route("/api/guest/uploads", post(handlers::guest_upload))
    .route("/api/guest/uploads/{identifier}", get(handlers::guest_status))
    .route("/api/guest/claim", post(handlers::guest_claim))
    .route("/api/account/defaults", put(handlers::set_defaults))
    .layer(
      ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
          .allow_origin(Any)
          .allow_methods(Any)
          .allow_headers(Any),
      ),
    )
    .with_state(app)
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  fn name(&self) -> &'static str {
    "http"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));
    let router = router(app)
      .layer(GovernorLayer::new(governor_conf))
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
          Ok(_) => info!("Server stopped gracefully"),
          Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}
