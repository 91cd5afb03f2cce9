//! End-to-end router tests against the in-memory store.
//!
//! Each test builds the full router with a `MemoryStore`-backed state and
//! drives it through `tower::ServiceExt::oneshot`, so the entire stack
//! (middleware, handlers, engine) runs without a database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use tallybook_api::app::{build_router, AppState};
use tallybook_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use tallybook_shared::auth::jwt::{create_token, Claims, TokenType};
use tallybook_shared::models::user::CreateUser;
use tallybook_shared::store::memory::MemoryStore;
use tallybook_shared::store::LedgerStore;

const SECRET: &str = "router-test-secret-at-least-32-bytes!!";

fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgresql://unused/test".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
    }
}

fn test_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), test_config());
    (state, store)
}

async fn seed_user(store: &MemoryStore, email: &str) -> (i64, String) {
    let user = store
        .create_user(CreateUser {
            email: email.to_string(),
            password_hash: "$argon2id$seeded".to_string(),
            name: None,
        })
        .await
        .unwrap();
    let token = create_token(&Claims::new(user.id, false, TokenType::Access), SECRET).unwrap();
    (user.id, token)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn send(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public_and_reports_connected() {
    let (state, _) = test_state();
    let response = build_router(state).oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let (state, _) = test_state();
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(get("/v1/teams", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Non-Bearer schemes are a malformed header, not a bad token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/teams")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A refresh token cannot stand in for an access token
    let refresh = create_token(&Claims::new(1, false, TokenType::Refresh), SECRET).unwrap();
    let response = app
        .oneshot(get("/v1/teams", Some(&refresh)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_refresh_roundtrip() {
    let (state, _) = test_state();
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(send(
            "POST",
            "/v1/auth/register",
            None,
            json!({ "email": "ada@example.com", "password": "ledgerpass1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let registered = body_json(response).await;
    assert!(registered["access_token"].is_string());

    let response = app
        .clone()
        .oneshot(send(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "ledgerpass1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let logged_in = body_json(response).await;

    let response = app
        .clone()
        .oneshot(send(
            "POST",
            "/v1/auth/refresh",
            None,
            json!({ "refresh_token": logged_in["refresh_token"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Wrong password is a 401
    let response = app
        .oneshot(send(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrongpass99" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_weak_passwords() {
    let (state, _) = test_state();
    let response = build_router(state)
        .oneshot(send(
            "POST",
            "/v1/auth/register",
            None,
            json!({ "email": "ada@example.com", "password": "short" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn team_creation_enrolls_creator_as_admin() {
    let (state, store) = test_state();
    let (user_id, token) = seed_user(&store, "admin@example.com").await;

    let response = build_router(state)
        .oneshot(send(
            "POST",
            "/v1/teams",
            Some(&token),
            json!({ "name": "household" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let team = body_json(response).await;

    let membership = store
        .membership(team["id"].as_i64().unwrap(), user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.role.as_str(), "admin");
}

#[tokio::test]
async fn team_fetch_honors_the_read_gate() {
    let (state, store) = test_state();
    let (_, admin_token) = seed_user(&store, "admin@example.com").await;
    let (_, outsider_token) = seed_user(&store, "outsider@example.com").await;
    let app = build_router(state);

    let team = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                "/v1/teams",
                Some(&admin_token),
                json!({ "name": "household" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let team_id = team["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/v1/teams/{}", team_id), Some(&admin_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["name"], "household");

    let response = app
        .oneshot(get(&format!("/v1/teams/{}", team_id), Some(&outsider_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn viewer_gets_403_with_write_access_required() {
    let (state, store) = test_state();
    let (_, admin_token) = seed_user(&store, "admin@example.com").await;
    let (viewer_id, viewer_token) = seed_user(&store, "viewer@example.com").await;
    let app = build_router(state);

    let team = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                "/v1/teams",
                Some(&admin_token),
                json!({ "name": "household" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let team_id = team["id"].as_i64().unwrap();

    app.clone()
        .oneshot(send(
            "POST",
            &format!("/v1/teams/{}/members", team_id),
            Some(&admin_token),
            json!({ "user_id": viewer_id, "role": "viewer" }),
        ))
        .await
        .unwrap();

    let book = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                &format!("/v1/teams/{}/books", team_id),
                Some(&admin_token),
                json!({ "name": "budget" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let book_id = book["id"].as_i64().unwrap();

    // Viewer can read the book
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/books/{}", book_id), Some(&viewer_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // But creating an account under it is refused
    let response = app
        .oneshot(send(
            "POST",
            &format!("/v1/books/{}/accounts", book_id),
            Some(&viewer_token),
            json!({ "name": "cash" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], "write access required");
}

#[tokio::test]
async fn outsider_cannot_see_a_book() {
    let (state, store) = test_state();
    let (_, admin_token) = seed_user(&store, "admin@example.com").await;
    let (_, outsider_token) = seed_user(&store, "outsider@example.com").await;
    let app = build_router(state);

    let team = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                "/v1/teams",
                Some(&admin_token),
                json!({ "name": "private" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let book = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                &format!("/v1/teams/{}/books", team["id"]),
                Some(&admin_token),
                json!({ "name": "secret" }),
            ))
            .await
            .unwrap(),
    )
    .await;

    let response = app
        .oneshot(get(
            &format!("/v1/books/{}", book["id"]),
            Some(&outsider_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], "access denied");
}

#[tokio::test]
async fn soft_deleted_team_hides_books_until_restore() {
    let (state, store) = test_state();
    let (_, token) = seed_user(&store, "admin@example.com").await;
    let app = build_router(state);

    let team = body_json(
        app.clone()
            .oneshot(send("POST", "/v1/teams", Some(&token), json!({ "name": "t" })))
            .await
            .unwrap(),
    )
    .await;
    let team_id = team["id"].as_i64().unwrap();
    let book = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                &format!("/v1/teams/{}/books", team_id),
                Some(&token),
                json!({ "name": "b" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let book_id = book["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/teams/{}", team_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The book is invisible even to the admin while the team is deleted
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/books/{}", book_id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(send(
            "POST",
            &format!("/v1/teams/{}/restore", team_id),
            Some(&token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/v1/books/{}", book_id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn removing_last_admin_is_a_400_with_reason() {
    let (state, store) = test_state();
    let (admin_id, token) = seed_user(&store, "solo-admin@example.com").await;
    let (member_id, _) = seed_user(&store, "member@example.com").await;
    let app = build_router(state);

    let team = body_json(
        app.clone()
            .oneshot(send("POST", "/v1/teams", Some(&token), json!({ "name": "t" })))
            .await
            .unwrap(),
    )
    .await;
    let team_id = team["id"].as_i64().unwrap();

    app.clone()
        .oneshot(send(
            "POST",
            &format!("/v1/teams/{}/members", team_id),
            Some(&token),
            json!({ "user_id": member_id, "role": "collaborator" }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/teams/{}/members/{}", team_id, admin_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "last admin");
}

#[tokio::test]
async fn transactions_flow_through_the_cascade() {
    let (state, store) = test_state();
    let (_, token) = seed_user(&store, "admin@example.com").await;
    let app = build_router(state);

    let team = body_json(
        app.clone()
            .oneshot(send("POST", "/v1/teams", Some(&token), json!({ "name": "t" })))
            .await
            .unwrap(),
    )
    .await;
    let book = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                &format!("/v1/teams/{}/books", team["id"]),
                Some(&token),
                json!({ "name": "b" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let account = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                &format!("/v1/books/{}/accounts", book["id"]),
                Some(&token),
                json!({ "name": "checking" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let account_id = account["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(send(
            "POST",
            &format!("/v1/accounts/{}/transactions", account_id),
            Some(&token),
            json!({
                "amount_cents": -1250,
                "memo": "coffee",
                "occurred_at": "2026-08-30T09:00:00Z"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(
            &format!("/v1/accounts/{}/transactions", account_id),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["amount_cents"], -1250);
}

#[tokio::test]
async fn cross_book_category_parent_is_rejected() {
    let (state, store) = test_state();
    let (_, token) = seed_user(&store, "admin@example.com").await;
    let app = build_router(state);

    let team = body_json(
        app.clone()
            .oneshot(send("POST", "/v1/teams", Some(&token), json!({ "name": "t" })))
            .await
            .unwrap(),
    )
    .await;
    let book_a = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                &format!("/v1/teams/{}/books", team["id"]),
                Some(&token),
                json!({ "name": "a" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let book_b = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                &format!("/v1/teams/{}/books", team["id"]),
                Some(&token),
                json!({ "name": "b" }),
            ))
            .await
            .unwrap(),
    )
    .await;

    let parent = body_json(
        app.clone()
            .oneshot(send(
                "POST",
                &format!("/v1/books/{}/categories", book_a["id"]),
                Some(&token),
                json!({ "name": "food" }),
            ))
            .await
            .unwrap(),
    )
    .await;

    // A category in book B cannot parent under book A's tree
    let response = app
        .clone()
        .oneshot(send(
            "POST",
            &format!("/v1/books/{}/categories", book_b["id"]),
            Some(&token),
            json!({ "name": "groceries", "parent_category_id": parent["id"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "parent category belongs to a different book"
    );

    // A parent id that exists nowhere is a plain 404
    let response = app
        .oneshot(send(
            "POST",
            &format!("/v1/books/{}/categories", book_b["id"]),
            Some(&token),
            json!({ "name": "orphaned", "parent_category_id": 424242 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
