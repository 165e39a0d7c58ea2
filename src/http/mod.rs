//! Thin `axum` REST surface over [`crate::service::AppState`]. This layer
//! owns no business logic: each handler validates shape, dispatches to the
//! service layer, and maps [`CoreError`] to an HTTP status.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::errors::CoreError;
use crate::models::{Chunk, Document, IndexType, Library, MetadataFilter, ScoredChunk};
use crate::service::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/libraries", post(create_library))
        .route(
            "/libraries/:id",
            get(get_library).put(update_library).delete(delete_library),
        )
        .route("/documents", post(create_document))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/chunks", post(create_chunk))
        .route("/chunks/:id", get(get_chunk).put(update_chunk).delete(delete_chunk))
        .route("/query", post(query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::DimensionMismatch { .. } => StatusCode::CONFLICT,
            CoreError::UnknownIndex(_) => StatusCode::BAD_REQUEST,
            CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CoreError::EmbeddingFailure(_) => StatusCode::BAD_GATEWAY,
            CoreError::Io(_) | CoreError::Json(_) | CoreError::Lock(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

type HandlerResult<T> = Result<Json<T>, CoreError>;

/// Assigns a fresh id when the caller didn't supply one, mirroring the
/// teacher's `Uuid::new_v4()` assignment at insert time.
fn ensure_id(id: &mut String) {
    if id.is_empty() {
        *id = uuid::Uuid::new_v4().to_string();
    }
}

async fn create_library(
    State(state): State<Arc<AppState>>,
    Json(mut library): Json<Library>,
) -> Result<(StatusCode, Json<Library>), CoreError> {
    ensure_id(&mut library.id);
    let created = library.clone();
    tokio::task::spawn_blocking(move || state.create_library(library))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_library(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> HandlerResult<Library> {
    let library = tokio::task::spawn_blocking(move || state.libraries.get(&id))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(Json(library))
}

async fn update_library(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(library): Json<Library>,
) -> Result<StatusCode, CoreError> {
    tokio::task::spawn_blocking(move || state.libraries.update(&id, library))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(StatusCode::OK)
}

async fn delete_library(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, CoreError> {
    tokio::task::spawn_blocking(move || state.delete_library(&id))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_document(
    State(state): State<Arc<AppState>>,
    Json(mut document): Json<Document>,
) -> Result<(StatusCode, Json<Document>), CoreError> {
    ensure_id(&mut document.id);
    let created = document.clone();
    tokio::task::spawn_blocking(move || state.create_document(document))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_document(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> HandlerResult<Document> {
    let document = tokio::task::spawn_blocking(move || state.documents.get(&id))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(Json(document))
}

async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(document): Json<Document>,
) -> Result<StatusCode, CoreError> {
    tokio::task::spawn_blocking(move || state.documents.update(&id, document))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(StatusCode::OK)
}

async fn delete_document(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, CoreError> {
    tokio::task::spawn_blocking(move || state.delete_document(&id))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_chunk(
    State(state): State<Arc<AppState>>,
    Json(mut chunk): Json<Chunk>,
) -> Result<(StatusCode, Json<Chunk>), CoreError> {
    ensure_id(&mut chunk.id);
    let created = chunk.clone();
    tokio::task::spawn_blocking(move || state.create_chunk(chunk))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_chunk(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> HandlerResult<Chunk> {
    let chunk = tokio::task::spawn_blocking(move || state.chunks.get(&id))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(Json(chunk))
}

async fn update_chunk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(chunk): Json<Chunk>,
) -> Result<StatusCode, CoreError> {
    tokio::task::spawn_blocking(move || state.chunks.update(&id, chunk))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(StatusCode::OK)
}

async fn delete_chunk(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, CoreError> {
    tokio::task::spawn_blocking(move || state.chunks.delete(&id))
        .await
        .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    #[allow(dead_code)]
    collection: String,
    index_type: IndexType,
    text: String,
    limit: usize,
    filter: Option<MetadataFilter>,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    results: Vec<ScoredChunk>,
}

async fn query(State(state): State<Arc<AppState>>, Json(req): Json<QueryRequest>) -> HandlerResult<QueryResponse> {
    if req.text.is_empty() {
        return Err(CoreError::InvalidInput("text must not be empty".to_string()));
    }
    let query_vector = state.embed_query(&req.text).await?;
    let results = tokio::task::spawn_blocking(move || {
        state.search_chunks(req.index_type, &query_vector, req.limit, req.filter)
    })
    .await
    .map_err(|e| CoreError::Lock(e.to_string()))??;
    Ok(Json(QueryResponse { results }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embedding::FixedEmbeddingProvider;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = dir.path().to_string_lossy().to_string();
        let embedder: Arc<dyn crate::embedding::EmbeddingProvider> =
            Arc::new(FixedEmbeddingProvider::new(4));
        let state = Arc::new(AppState::open(&config, embedder).unwrap());
        (dir, state)
    }

    #[tokio::test]
    async fn creating_a_library_returns_201() {
        let (_dir, state) = test_state();
        let app = router(state);
        let body = serde_json::json!({ "id": "lib1", "metadata": {} }).to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/libraries")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn getting_a_missing_library_returns_404() {
        let (_dir, state) = test_state();
        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/libraries/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_a_library_cascades_over_http() {
        let (_dir, state) = test_state();
        state.create_library(crate::models::Library {
            id: "lib1".to_string(),
            metadata: Default::default(),
        }).unwrap();
        state.create_document(crate::models::Document {
            id: "doc1".to_string(),
            library_id: "lib1".to_string(),
            metadata: Default::default(),
        }).unwrap();
        state.create_chunk(crate::models::Chunk {
            id: "c1".to_string(),
            text: "hi".to_string(),
            embedding: vec![1.0, 0.0, 0.0, 0.0],
            metadata: Default::default(),
            library_id: "lib1".to_string(),
            document_id: "doc1".to_string(),
        }).unwrap();

        let app = router(state.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/libraries/lib1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.chunks.list().unwrap().len(), 0);
        assert_eq!(state.documents.list().unwrap().len(), 0);
    }
}
