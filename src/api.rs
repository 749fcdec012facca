// src/api.rs
//! Read-only HTTP surface over the comments table for dashboards.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::error::LoadError;
use crate::store::{RecentQuery, Store, StoredRow, Summary};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/comments", get(comments))
        .route("/summary", get(summary))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub struct ApiError(LoadError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "read query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "database unavailable" })),
        )
            .into_response()
    }
}

impl From<LoadError> for ApiError {
    fn from(e: LoadError) -> Self {
        Self(e)
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommentsParams {
    limit: Option<u32>,
    subreddit: Option<String>,
    sentiment: Option<String>,
}

async fn comments(
    State(state): State<AppState>,
    Query(p): Query<CommentsParams>,
) -> Result<Json<Vec<StoredRow>>, ApiError> {
    let q = RecentQuery {
        limit: p.limit,
        subreddit: p.subreddit.filter(|s| !s.is_empty()),
        sentiment: p.sentiment.filter(|s| !s.is_empty()),
    };
    Ok(Json(state.store.recent(&q).await?))
}

async fn summary(State(state): State<AppState>) -> Result<Json<Summary>, ApiError> {
    Ok(Json(state.store.summary().await?))
}
