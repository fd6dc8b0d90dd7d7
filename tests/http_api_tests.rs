//! HTTP integration tests: route table, auth gate, invite lifecycle, task
//! transitions and the streamed task list, driven in-process through the router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use workroom::identity::TokenService;
use workroom::server::{router, AllowedOrigins, AppState, LIVENESS_TEXT};
use workroom::storage::MemoryStore;

const SECRET: &str = "test-secret";
const ORIGIN_OK: &str = "http://localhost:3000";

fn app() -> (Router, AppState) {
    let state = AppState::new(Arc::new(MemoryStore::new()), TokenService::new(SECRET));
    let origins = AllowedOrigins::new(vec![ORIGIN_OK.to_string()]);
    (router(state.clone(), origins), state)
}

fn request(method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    match body {
        Some(v) => b.header(header::CONTENT_TYPE, "application/json").body(Body::from(v.to_string())).unwrap(),
        None => b.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, req).await;
    let v = serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("non-JSON body ({}): {:?}", e, String::from_utf8_lossy(&bytes)));
    (status, v)
}

/// Register a user through the API and return the minted token.
async fn register(app: &Router, email: &str, role: &str) -> String {
    let (status, body) = send_json(
        app,
        request(Method::PUT, &format!("/user/{}", email), Some(json!({"email": email, "role": role})), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn liveness_is_plain_text() {
    let (app, _) = app();
    let (status, body) = send(&app, request(Method::GET, "/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), LIVENESS_TEXT);
}

#[tokio::test]
async fn user_upsert_returns_result_and_token() {
    let (app, state) = app();
    let (status, body) = send_json(
        &app,
        request(Method::PUT, "/user/a@x.com", Some(json!({"email": "a@x.com", "role": "member"})), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["acknowledged"], true);
    assert_eq!(body["result"]["upsertedCount"], 1);
    let token = body["token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert_eq!(state.tokens.decode(token).unwrap().email, "a@x.com");
}

#[tokio::test]
async fn get_user_enforces_self_access() {
    let (app, _) = app();
    let token_a = register(&app, "a@x.com", "member").await;
    let token_b = register(&app, "b@x.com", "member").await;

    let (status, body) = send_json(&app, request(Method::GET, "/user/a@x.com", None, Some(&token_b))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "forbidden access");

    let (status, body) = send_json(&app, request(Method::GET, "/user/a@x.com", None, Some(&token_a))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["role"], "member");
}

#[tokio::test]
async fn missing_and_bad_tokens_map_to_401_and_403() {
    let (app, _) = app();
    let (status, body) = send_json(&app, request(Method::GET, "/user/a@x.com", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized access");

    let (status, body) = send_json(&app, request(Method::GET, "/user/a@x.com", None, Some("garbage"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden access");

    let foreign = TokenService::new("other-secret").mint(&serde_json::Map::from_iter([("email".to_string(), json!("a@x.com"))])).unwrap();
    let (status, _) = send_json(&app, request(Method::GET, "/user/a@x.com", None, Some(&foreign))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn user_listing_requires_stored_admin_role() {
    let (app, state) = app();
    let member = register(&app, "m@x.com", "member").await;
    let admin = register(&app, "root@x.com", "admin").await;

    let (status, _) = send_json(&app, request(Method::GET, "/users", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(&app, request(Method::GET, "/users", None, Some(&member))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send_json(&app, request(Method::GET, "/users", None, Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // demoting in the store revokes access even though the token still says admin
    state.users.upsert("root@x.com", serde_json::Map::from_iter([("role".to_string(), json!("member"))])).await.unwrap();
    let (status, _) = send_json(&app, request(Method::GET, "/users", None, Some(&admin))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send_json(&app, request(Method::GET, "/allUsers", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn task_transition_moves_between_lists() {
    let (app, _) = app();
    let (status, created) =
        send_json(&app, request(Method::POST, "/task", Some(json!({"title": "T", "taskMove": "new"})), None)).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["insertedId"].as_str().unwrap().to_string();

    let (status, moved) = send_json(&app, request(Method::PUT, &format!("/task/ongoing/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["matchedCount"], 1);

    let (_, ongoing) = send_json(&app, request(Method::GET, "/taskOngoingData", None, None)).await;
    assert!(ongoing.as_array().unwrap().iter().any(|t| t["_id"] == id.as_str()));
    let (_, fresh) = send_json(&app, request(Method::GET, "/taskNewData", None, None)).await;
    assert!(fresh.as_array().unwrap().is_empty());

    send_json(&app, request(Method::PUT, &format!("/task/done/{}", id), None, None)).await;
    let (_, done) = send_json(&app, request(Method::GET, "/taskDoneData", None, None)).await;
    assert_eq!(done[0]["title"], "T");

    let (_, one) = send_json(&app, request(Method::GET, &format!("/task/{}", id), None, None)).await;
    assert_eq!(one["taskMove"], "done");

    let (_, deleted) = send_json(&app, request(Method::DELETE, &format!("/task/{}", id), None, None)).await;
    assert_eq!(deleted["deletedCount"], 1);
    let (status, gone) = send_json(&app, request(Method::GET, &format!("/task/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(gone.is_null());
}

#[tokio::test]
async fn streamed_task_list_equals_buffered_list() {
    let (app, state) = app();
    for i in 0..25 {
        let column = ["new", "ongoing", "done"][i % 3];
        send_json(&app, request(Method::POST, "/task", Some(json!({"title": format!("t{}", i), "taskMove": column})), None)).await;
    }
    let resp = app.clone().oneshot(request(Method::GET, "/task", None, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let streamed: Value = serde_json::from_slice(&bytes).unwrap();
    let buffered = serde_json::to_value(state.tasks.list().await.unwrap()).unwrap();
    assert_eq!(streamed, buffered);
    assert_eq!(streamed.as_array().unwrap().len(), 25);
}

#[tokio::test]
async fn empty_task_stream_is_empty_array() {
    let (app, _) = app();
    let (status, body) = send(&app, request(Method::GET, "/task", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn invite_then_accept_lifecycle() {
    let (app, _) = app();
    let host = register(&app, "h@x.com", "member").await;
    let (status, created) = send_json(
        &app,
        request(Method::POST, "/works", Some(json!({"UserEmail": "h@x.com", "location": "Dhaka"})), Some(&host)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["insertedId"].as_str().unwrap().to_string();

    let invite = json!({
        "inviterEmail": "h@x.com",
        "invitedEmail": ["b@x.com"],
        "inviteWorkId": id,
        "inviteWorkspaceName": "Room",
        "inviteDateTime": "2024-01-01T09:00"
    });
    let (status, r) = send_json(&app, request(Method::PUT, &format!("/users/sentInvite/{}", id), Some(invite), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(r["modifiedCount"], 1);

    let (_, invited) = send_json(&app, request(Method::GET, "/worksInvited/b@x.com", None, None)).await;
    assert_eq!(invited.as_array().unwrap().len(), 1);

    let accept = json!({"acceptedEmail": "b@x.com", "acceptInviteDateTime": "2024-01-02T09:00"});
    let (status, _) = send_json(&app, request(Method::PUT, &format!("/users/sentAccepted/{}", id), Some(accept.clone()), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, again) = send_json(&app, request(Method::PUT, &format!("/users/sentAccepted/{}", id), Some(accept), None)).await;
    assert_eq!(again["modifiedCount"], 0);

    let (_, work) = send_json(&app, request(Method::GET, &format!("/home/{}", id), None, None)).await;
    assert_eq!(work["acceptedEmails"], json!(["b@x.com"]));
    assert_eq!(work["invitedEmail"], json!([]));
    assert_eq!(work["invite"], "accepted");

    let (_, accepted) = send_json(&app, request(Method::GET, "/acceptedEmails/b@x.com", None, None)).await;
    assert_eq!(accepted.as_array().unwrap().len(), 1);
    let (_, invited) = send_json(&app, request(Method::GET, "/worksInvited/b@x.com", None, None)).await;
    assert!(invited.as_array().unwrap().is_empty());
    let (_, mine) = send_json(&app, request(Method::GET, "/works/h@x.com", None, None)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn work_writes_require_a_token() {
    let (app, _) = app();
    let token = register(&app, "h@x.com", "member").await;
    let (status, _) = send_json(&app, request(Method::POST, "/works", Some(json!({"location": "X"})), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send_json(&app, request(Method::PUT, "/works", Some(json!({"location": "X"})), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, created) = send_json(&app, request(Method::POST, "/works", Some(json!({"location": "X"})), Some(&token))).await;
    let id = created["insertedId"].as_str().unwrap().to_string();
    let (status, _) = send_json(&app, request(Method::DELETE, &format!("/home/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, deleted) = send_json(&app, request(Method::DELETE, &format!("/home/{}", id), None, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deletedCount"], 1);
}

// PUT /works carries no id: it patches whichever work room the store yields first.
#[tokio::test]
async fn unscoped_work_update_patches_first_record() {
    let (app, _) = app();
    let token = register(&app, "h@x.com", "member").await;
    send_json(&app, request(Method::POST, "/works", Some(json!({"name": "first"})), Some(&token))).await;
    send_json(&app, request(Method::POST, "/works", Some(json!({"name": "second"})), Some(&token))).await;
    let (status, r) = send_json(&app, request(Method::PUT, "/works", Some(json!({"name": "patched"})), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(r["matchedCount"], 1);
    let (_, all) = send_json(&app, request(Method::GET, "/works", None, None)).await;
    let names: Vec<&str> = all.as_array().unwrap().iter().map(|w| w["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["patched", "second"]);
}

#[tokio::test]
async fn search_filters_by_exact_location() {
    let (app, _) = app();
    let token = register(&app, "h@x.com", "member").await;
    for loc in ["Dhaka", "Paris", "Dhaka"] {
        send_json(&app, request(Method::POST, "/works", Some(json!({"location": loc})), Some(&token))).await;
    }
    let (_, dhaka) = send_json(&app, request(Method::GET, "/search-result?location=Dhaka", None, None)).await;
    assert_eq!(dhaka.as_array().unwrap().len(), 2);
    let (_, all) = send_json(&app, request(Method::GET, "/search-result", None, None)).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
    let (_, blank) = send_json(&app, request(Method::GET, "/search-result?location=", None, None)).await;
    assert_eq!(blank.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn malformed_ids_are_invalid_key() {
    let (app, _) = app();
    for (method, uri) in [
        (Method::GET, "/task/not-an-id"),
        (Method::DELETE, "/task/123"),
        (Method::PUT, "/task/ongoing/xyz"),
        (Method::GET, "/home/zzzzzzzzzzzzzzzzzzzzzzzz"),
    ] {
        let (status, body) = send_json(&app, request(method, uri, None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["code"], "invalid_key");
    }
}

#[tokio::test]
async fn origin_allow_list() {
    let (app, _) = app();
    let allowed = Request::builder().uri("/").header(header::ORIGIN, ORIGIN_OK).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(allowed).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN_OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let denied = Request::builder().uri("/").header(header::ORIGIN, "https://evil.example").body(Body::empty()).unwrap();
    let (status, body) = send_json(&app, denied).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "cors_rejected");

    let (status, _) = send(&app, request(Method::GET, "/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_with_audience_still_authenticates() {
    let (app, _) = app();
    let (_, body) = send_json(
        &app,
        request(Method::PUT, "/user/a@x.com", Some(json!({"email": "a@x.com", "role": "member", "aud": "web"})), None),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();
    let (status, user) = send_json(&app, request(Method::GET, "/user/a@x.com", None, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["aud"], "web");
}

#[tokio::test]
async fn body_rejections_use_the_error_body() {
    let (app, _) = app();
    let token = register(&app, "h@x.com", "member").await;
    let (_, created) = send_json(&app, request(Method::POST, "/works", Some(json!({"location": "X"})), Some(&token))).await;
    let id = created["insertedId"].as_str().unwrap().to_string();

    // acceptedEmail is required
    let (status, body) = send_json(
        &app,
        request(Method::PUT, &format!("/users/sentAccepted/{}", id), Some(json!({"acceptInviteDateTime": "t"})), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
    assert!(body["message"].as_str().unwrap().contains("acceptedEmail"));

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/task")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\":"))
        .unwrap();
    let (status, body) = send_json(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");

    let no_content_type = Request::builder().method(Method::POST).uri("/task").body(Body::from("{}")).unwrap();
    let (status, body) = send_json(&app, no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");

    let (status, body) = send_json(&app, request(Method::PUT, "/user/a@x.com", Some(json!([1, 2])), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn store_write_failure_is_500_and_leaves_record_unchanged() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::new(Arc::new(MemoryStore::open(tmp.path()).unwrap()), TokenService::new(SECRET));
    let app = router(state, AllowedOrigins::new(vec![ORIGIN_OK.to_string()]));
    let token = register(&app, "h@x.com", "member").await;
    let (_, created) =
        send_json(&app, request(Method::POST, "/works", Some(json!({"invitedEmail": ["b@x.com"]})), Some(&token))).await;
    let id = created["insertedId"].as_str().unwrap().to_string();

    std::fs::create_dir(tmp.path().join("work-room.json.tmp")).unwrap();
    let accept = json!({"acceptedEmail": "b@x.com"});
    let (status, body) =
        send_json(&app, request(Method::PUT, &format!("/users/sentAccepted/{}", id), Some(accept), None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error updating document");

    let (_, work) = send_json(&app, request(Method::GET, &format!("/home/{}", id), None, None)).await;
    assert_eq!(work["invitedEmail"], json!(["b@x.com"]));
    assert!(work.get("acceptedEmails").is_none());
    assert!(work.get("invite").is_none());
}
