//! Axum-based HTTP API.
//!
//! Routes:
//!
//! | Method | Path                         | Body / query                                  |
//! |--------|------------------------------|-----------------------------------------------|
//! | POST   | `/api/votes`                 | `{ postId, voterAddress, signature, message, action }` |
//! | POST   | `/api/comment-votes`         | `{ commentId, voterAddress, signature, message, action }` |
//! | POST   | `/api/posts`                 | `{ title, imageUrl, tags, authorAddress, signature, message }` |
//! | POST   | `/api/comments`              | `{ postId, authorAddress, content, signature, message }` |
//! | GET    | `/api/posts/:id`             |                                               |
//! | GET    | `/api/posts/:id/comments`    |                                               |
//! | GET    | `/api/votes/status`          | `?postId&voterAddress`                        |
//! | GET    | `/api/comment-votes/status`  | `?commentId&voterAddress`                     |
//!
//! Errors are returned as `{ "error": <category>, "message": <text> }`.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

use dimgur_core::{
    Comment, CommentId, CommentVoteRequest, CreateCommentRequest, CreatePostRequest, Post, PostId,
    ValidationError, VoteRequest, VoteTally, WalletAddress,
};
use dimgur_store::Store;

use crate::error::{Result, ServiceError};
use crate::service::VoteService;

type Shared<S> = State<Arc<VoteService<S>>>;

/// Build the API router over a service.
pub fn router<S: Store + 'static>(service: Arc<VoteService<S>>) -> Router {
    Router::new()
        .route("/api/votes", post(vote_post::<S>))
        .route("/api/votes/status", get(post_vote_status::<S>))
        .route("/api/comment-votes", post(vote_comment::<S>))
        .route("/api/comment-votes/status", get(comment_vote_status::<S>))
        .route("/api/posts", post(create_post::<S>))
        .route("/api/posts/:id", get(get_post::<S>))
        .route("/api/posts/:id/comments", get(list_comments::<S>))
        .route("/api/comments", post(create_comment::<S>))
        .with_state(service)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<S, F>(
    listener: TcpListener,
    service: Arc<VoteService<S>>,
    shutdown: F,
) -> std::io::Result<()>
where
    S: Store + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "API listening");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let body = json!({ "error": self.category(), "message": message });
        (status, Json(body)).into_response()
    }
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload.map(|Json(t)| t).map_err(|rejection| {
        ServiceError::Validation(ValidationError::InvalidField {
            field: "body",
            reason: rejection.body_text(),
        })
    })
}

fn query<T>(params: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    params.map(|Query(t)| t).map_err(|rejection| {
        ServiceError::Validation(ValidationError::InvalidField {
            field: "query",
            reason: rejection.body_text(),
        })
    })
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field).into()),
    }
}

fn post_id(raw: &str) -> Result<PostId> {
    PostId::parse(raw).map_err(|e| {
        ServiceError::Validation(ValidationError::InvalidField {
            field: "postId",
            reason: e.to_string(),
        })
    })
}

fn comment_id(raw: &str) -> Result<CommentId> {
    CommentId::parse(raw).map_err(|e| {
        ServiceError::Validation(ValidationError::InvalidField {
            field: "commentId",
            reason: e.to_string(),
        })
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn vote_post<S: Store + 'static>(
    State(service): Shared<S>,
    payload: std::result::Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteTally>> {
    let req = body(payload)?;
    Ok(Json(service.vote_post(&req).await?))
}

async fn vote_comment<S: Store + 'static>(
    State(service): Shared<S>,
    payload: std::result::Result<Json<CommentVoteRequest>, JsonRejection>,
) -> Result<Json<VoteTally>> {
    let req = body(payload)?;
    Ok(Json(service.vote_comment(&req).await?))
}

async fn create_post<S: Store + 'static>(
    State(service): Shared<S>,
    payload: std::result::Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>)> {
    let req = body(payload)?;
    Ok((StatusCode::CREATED, Json(service.create_post(&req).await?)))
}

async fn create_comment<S: Store + 'static>(
    State(service): Shared<S>,
    payload: std::result::Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>)> {
    let req = body(payload)?;
    Ok((StatusCode::CREATED, Json(service.create_comment(&req).await?)))
}

async fn get_post<S: Store + 'static>(
    State(service): Shared<S>,
    Path(id): Path<String>,
) -> Result<Json<Post>> {
    Ok(Json(service.get_post(&post_id(&id)?).await?))
}

async fn list_comments<S: Store + 'static>(
    State(service): Shared<S>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>> {
    Ok(Json(service.list_comments(&post_id(&id)?).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostVoteStatusQuery {
    post_id: Option<String>,
    voter_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentVoteStatusQuery {
    comment_id: Option<String>,
    voter_address: Option<String>,
}

/// `GET .../status` response.
#[derive(Debug, Serialize)]
struct VoteStatus {
    voted: bool,
}

async fn post_vote_status<S: Store + 'static>(
    State(service): Shared<S>,
    params: std::result::Result<Query<PostVoteStatusQuery>, QueryRejection>,
) -> Result<Json<VoteStatus>> {
    let q = query(params)?;
    let id = post_id(required("postId", &q.post_id)?)?;
    let voter = WalletAddress::parse(required("voterAddress", &q.voter_address)?)?;
    Ok(Json(VoteStatus {
        voted: service.has_voted_post(&id, &voter).await,
    }))
}

async fn comment_vote_status<S: Store + 'static>(
    State(service): Shared<S>,
    params: std::result::Result<Query<CommentVoteStatusQuery>, QueryRejection>,
) -> Result<Json<VoteStatus>> {
    let q = query(params)?;
    let id = comment_id(required("commentId", &q.comment_id)?)?;
    let voter = WalletAddress::parse(required("voterAddress", &q.voter_address)?)?;
    Ok(Json(VoteStatus {
        voted: service.has_voted_comment(&id, &voter).await,
    }))
}
