use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod auth;
pub mod error;
pub mod posts;
pub mod startup_checks;

pub use posts::PostsConfig;

pub const DEFAULT_AUTH_SECRET: &str = "change-me-in-production";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub posts: PostsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the resource routes are mounted under, e.g. `/api`.
    #[serde(default)]
    pub api_prefix: String,
}

impl ServerConfig {
    /// `api_prefix` with a leading slash and no trailing slash; empty for the root.
    pub fn normalized_api_prefix(&self) -> String {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    pub auth_secret: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// JSON file holding the posts. Posts live in memory only when unset.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UsersConfig {
    pub database: PathBuf,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("users.toml"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                api_prefix: String::new(),
            },
            app: AppConfig {
                name: "Postdesk".to_string(),
                log_level: "info".to_string(),
                auth_secret: DEFAULT_AUTH_SECRET.to_string(),
            },
            storage: StorageConfig {
                data_file: Some(PathBuf::from("data/posts.json")),
            },
            users: UsersConfig::default(),
            posts: PostsConfig::default(),
        }
    }
}

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: posts::SharedStore,
    pub users: Arc<auth::UserDatabase>,
    pub config: Config,
}

impl AppState {
    /// Opens the post store and loads the user database named by `config`.
    pub async fn from_config(config: Config) -> Result<Self, startup_checks::StartupCheckError> {
        let store = match &config.storage.data_file {
            Some(path) => posts::PostStore::open(path).await?,
            None => posts::PostStore::in_memory(),
        };

        let users = if config.users.database.exists() {
            auth::UserDatabase::read(&config.users.database)
                .await
                .map_err(startup_checks::StartupCheckError::UsersDatabaseUnreadable)?
        } else {
            tracing::warn!(
                "User database {:?} not found, every request will be rejected",
                config.users.database
            );
            auth::UserDatabase::new()
        };

        Ok(Self {
            store: Arc::new(store),
            users: Arc::new(users),
            config,
        })
    }
}

fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::show_post)
                .put(posts::update_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
}

async fn route_not_found() -> error::ApiError {
    error::ApiError::NotFound("Route")
}

pub fn create_router(app_state: AppState) -> Router {
    let prefix = app_state.config.server.normalized_api_prefix();

    let router = if prefix.is_empty() {
        Router::new().merge(post_routes())
    } else {
        Router::new().nest(&prefix, post_routes())
    };

    router
        .fallback(route_not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}

pub async fn create_app(config: Config) -> Result<Router, startup_checks::StartupCheckError> {
    let app_state = AppState::from_config(config).await?;
    Ok(create_router(app_state))
}
