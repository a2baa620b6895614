//! HTTP document store: every key holds one opaque JSON value that clients
//! read with GET and overwrite with POST.

pub mod config;
pub mod documents;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::de::IgnoredAny;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error};

use crate::config::StorageSettings;
use crate::documents::{is_valid_key, DocumentDirectory};

#[derive(Clone)]
pub struct AppState {
    documents: Arc<DocumentDirectory>,
    max_body_bytes: usize,
}

impl AppState {
    pub async fn open(storage: &StorageSettings) -> anyhow::Result<Self> {
        Ok(Self {
            documents: Arc::new(DocumentDirectory::open(&storage.data_dir).await?),
            max_body_bytes: storage.max_body_bytes,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/documents/{key}",
            get(get_document_handler).post(put_document_handler),
        )
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state);

    Router::new().nest("/api", api).layer(cors)
}

type ApiError = (StatusCode, String);

fn check_key(key: &str) -> Result<(), ApiError> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err((StatusCode::BAD_REQUEST, format!("invalid document key '{key}'")))
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn get_document_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    check_key(&key)?;
    let no_store = [(header::CACHE_CONTROL, "no-store")];
    match state.documents.get(&key).await {
        Ok(Some(body)) => Ok((
            no_store,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()),
        Ok(None) => Ok((
            StatusCode::NOT_FOUND,
            no_store,
            format!("no document stored under '{key}'"),
        )
            .into_response()),
        Err(e) => {
            error!(%key, error = %e, "failed to read document");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "failed to read document".into()))
        }
    }
}

async fn put_document_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    check_key(&key)?;
    if serde_json::from_slice::<IgnoredAny>(&body).is_err() {
        return Err((StatusCode::BAD_REQUEST, "document must be valid JSON".into()));
    }
    if let Err(e) = state.documents.put(&key, &body).await {
        error!(%key, error = %e, "failed to store document");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "failed to store document".into()));
    }
    debug!(%key, bytes = body.len(), "document replaced");
    Ok(StatusCode::NO_CONTENT)
}
