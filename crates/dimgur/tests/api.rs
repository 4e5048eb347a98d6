//! HTTP tests driving the router directly, without a socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use dimgur::core::{
    comment_vote_message, create_comment_message, create_post_message, post_vote_message,
};
use dimgur::store::MemoryStore;
use dimgur::{api, Keypair, Policy, PostId, VoteAction, VoteService};

fn app() -> Router {
    api::router(Arc::new(VoteService::new(MemoryStore::new(), Policy::default())))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_post(app: &Router, author: &Keypair, title: &str) -> String {
    let message = create_post_message(title, Utc::now());
    let (status, body) = send(
        app,
        "POST",
        "/api/posts",
        Some(json!({
            "title": title,
            "imageUrl": "https://gateway.example/ipfs/abc",
            "tags": ["Sky"],
            "authorAddress": author.address().to_base58(),
            "signature": author.sign(message.as_bytes()).to_base58(),
            "message": message,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["tags"], json!(["sky"]));
    body["id"].as_str().unwrap().to_string()
}

fn vote_body(voter: &Keypair, post_id: &str, action: VoteAction) -> Value {
    let id = PostId::parse(post_id).unwrap();
    let message = post_vote_message(action, &id, Utc::now());
    json!({
        "postId": post_id,
        "voterAddress": voter.address().to_base58(),
        "signature": voter.sign(message.as_bytes()).to_base58(),
        "message": message,
        "action": action.as_str(),
    })
}

#[tokio::test]
async fn test_vote_lifecycle_over_http() {
    let app = app();
    let post_id = create_post(&app, &Keypair::generate(), "sunset").await;
    let voter = Keypair::generate();

    let req = vote_body(&voter, &post_id, VoteAction::Add);
    let (status, body) = send(&app, "POST", "/api/votes", Some(req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "voted": true, "voteCount": 1 }));

    let req = vote_body(&voter, &post_id, VoteAction::Add);
    let (status, body) = send(&app, "POST", "/api/votes", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "already-voted");

    let uri = format!(
        "/api/votes/status?postId={post_id}&voterAddress={}",
        voter.address().to_base58()
    );
    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(body, json!({ "voted": true }));

    let req = vote_body(&voter, &post_id, VoteAction::Remove);
    let (status, body) = send(&app, "POST", "/api/votes", Some(req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "voted": false, "voteCount": 0 }));

    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(body, json!({ "voted": false }));

    let req = vote_body(&voter, &post_id, VoteAction::Remove);
    let (status, body) = send(&app, "POST", "/api/votes", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no-existing-vote");
}

#[tokio::test]
async fn test_forged_vote_is_unauthorized() {
    let app = app();
    let post_id = create_post(&app, &Keypair::generate(), "forged").await;
    let victim = Keypair::generate();
    let attacker = Keypair::generate();

    let mut body = vote_body(&attacker, &post_id, VoteAction::Add);
    body["voterAddress"] = json!(victim.address().to_base58());

    let (status, body) = send(&app, "POST", "/api/votes", Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid-signature");

    let (_, post) = send(&app, "GET", &format!("/api/posts/{post_id}"), None).await;
    assert_eq!(post["voteCount"], 0);
}

#[tokio::test]
async fn test_validation_failures() {
    let app = app();
    let voter = Keypair::generate();

    let mut missing = vote_body(&voter, "P1", VoteAction::Add);
    missing.as_object_mut().unwrap().remove("signature");
    let (status, body) = send(&app, "POST", "/api/votes", Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation-failed");

    let mut bad_address = vote_body(&voter, "P1", VoteAction::Add);
    bad_address["voterAddress"] = json!("0OIl");
    let (status, body) = send(&app, "POST", "/api/votes", Some(bad_address)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation-failed");

    let req = json!("not an object");
    let (status, body) = send(&app, "POST", "/api/comment-votes", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation-failed");
}

#[tokio::test]
async fn test_comments_and_comment_votes() {
    let app = app();
    let author = Keypair::generate();
    let post_id = create_post(&app, &author, "harbour").await;

    let message = create_comment_message("lovely light", Utc::now());
    let (status, comment) = send(
        &app,
        "POST",
        "/api/comments",
        Some(json!({
            "postId": post_id,
            "authorAddress": author.address().to_base58(),
            "content": "lovely light",
            "signature": author.sign(message.as_bytes()).to_base58(),
            "message": message,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{comment}");
    let comment_id = comment["id"].as_str().unwrap().to_string();

    let voter = Keypair::generate();
    let message = comment_vote_message(&dimgur::CommentId::parse(comment_id.as_str()).unwrap());
    let (status, body) = send(
        &app,
        "POST",
        "/api/comment-votes",
        Some(json!({
            "commentId": comment_id,
            "voterAddress": voter.address().to_base58(),
            "signature": voter.sign(message.as_bytes()).to_base58(),
            "message": message,
            "action": "add",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "voted": true, "voteCount": 1 }));

    let (_, comments) = send(&app, "GET", &format!("/api/posts/{post_id}/comments"), None).await;
    assert_eq!(comments[0]["voteCount"], 1);
    assert_eq!(comments[0]["content"], "lovely light");

    let (_, post) = send(&app, "GET", &format!("/api/posts/{post_id}"), None).await;
    assert_eq!(post["voteCount"], 0);

    let uri = format!(
        "/api/comment-votes/status?commentId={comment_id}&voterAddress={}",
        voter.address().to_base58()
    );
    let (_, status_body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status_body, json!({ "voted": true }));
}

#[tokio::test]
async fn test_unknown_post_is_not_found() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/posts/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not-found");

    let voter = Keypair::generate();
    let req = vote_body(&voter, "nope", VoteAction::Add);
    let (status, body) = send(&app, "POST", "/api/votes", Some(req)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not-found");
}
