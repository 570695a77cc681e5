use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use minitasks::{
    app::build_app,
    config::{AppConfig, JwtConfig},
    state::AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        jwt: JwtConfig {
            secret: SECRET.into(),
            issuer: "minitasks".into(),
            audience: "minitasks-users".into(),
        },
        host: "127.0.0.1".into(),
        port: 0,
    }
}

fn setup() -> Router {
    build_app(AppState::in_memory(test_config()))
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": name,
                "email": email,
                "password": "secret1",
                "passwordConfirm": "secret1"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn create_task(app: &Router, token: &str, title: &str) -> Value {
    let (status, body) = send(
        app,
        request("POST", "/api/tasks", Some(token), Some(json!({ "title": title }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body
}

#[tokio::test]
async fn end_to_end_scenario() {
    let app = setup();

    let (status, registered) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Ann Lee",
                "email": "ann@x.com",
                "password": "secret1",
                "passwordConfirm": "secret1"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(registered["token"].is_string());
    assert_eq!(registered["user"]["name"], "Ann Lee");
    assert!(registered["user"].get("password").is_none());
    assert!(registered["user"].get("passwordHash").is_none());

    let (status, logged_in) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@x.com", "password": "secret1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged_in["user"]["id"], registered["user"]["id"]);
    let token = logged_in["token"].as_str().unwrap().to_string();

    let task = create_task(&app, &token, "Buy milk").await;
    assert_eq!(task["completed"], false);
    assert_eq!(task["owner"], registered["user"]["id"]);
    assert!(task["description"].is_null());
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, list) = send(&app, request("GET", "/api/tasks?q=milk", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![task_id.as_str()]);

    let uri = format!("/api/tasks/{task_id}");
    let (status, body) = send(&app, request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Deleted" }));

    let (status, body) = send(&app, request("GET", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Not found" }));
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = setup();
    let (_, first_id) = register(&app, "Ann Lee", "ann@x.com").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Someone Else",
                "email": "ANN@x.com",
                "password": "another1",
                "passwordConfirm": "another1"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "errors": [{ "field": "email", "message": "Email already registered" }] })
    );

    // the original account still logs in with its own password
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@x.com", "password": "secret1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], first_id);
    assert_eq!(body["user"]["name"], "Ann Lee");
}

#[tokio::test]
async fn register_reports_field_errors() {
    let app = setup();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Al", "email": "nope", "password": "secret1", "passwordConfirm": "secret2" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "errors": [
            { "field": "name", "message": "Name must be at least 3 characters" },
            { "field": "email", "message": "Invalid email format" },
            { "field": "passwordConfirm", "message": "Passwords do not match" }
        ] })
    );
}

#[tokio::test]
async fn login_failures_are_field_tagged() {
    let app = setup();
    register(&app, "Ann Lee", "ann@x.com").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "bob@x.com", "password": "secret1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "errors": [{ "field": "email", "message": "Account not found please register" }] })
    );

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@x.com", "password": "wrong-one" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "errors": [{ "field": "password", "message": "Invalid password" }] })
    );
}

#[tokio::test]
async fn malformed_json_body_is_a_field_error() {
    let app = setup();
    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "body");
}

#[tokio::test]
async fn foreign_tasks_look_like_missing_tasks() {
    let app = setup();
    let (ann, _) = register(&app, "Ann Lee", "ann@x.com").await;
    let (bob, _) = register(&app, "Bob Ray", "bob@x.com").await;

    let task = create_task(&app, &ann, "Ann's secret").await;
    let foreign = format!("/api/tasks/{}", task["id"].as_str().unwrap());
    let missing = format!("/api/tasks/{}", uuid::Uuid::new_v4());

    for uri in [&foreign, &missing, &"/api/tasks/not-a-uuid".to_string()] {
        let (status, body) = send(&app, request("GET", uri, Some(&bob), None)).await;
        assert_eq!((status, body), (StatusCode::NOT_FOUND, json!({ "message": "Not found" })));

        let (status, body) = send(
            &app,
            request("PUT", uri, Some(&bob), Some(json!({ "completed": true }))),
        )
        .await;
        assert_eq!((status, body), (StatusCode::NOT_FOUND, json!({ "message": "Not found" })));

        let (status, body) = send(&app, request("DELETE", uri, Some(&bob), None)).await;
        assert_eq!((status, body), (StatusCode::NOT_FOUND, json!({ "message": "Not found" })));
    }

    let (_, bobs) = send(&app, request("GET", "/api/tasks", Some(&bob), None)).await;
    assert_eq!(bobs, json!([]));

    let (status, body) = send(&app, request("GET", &foreign, Some(&ann), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], false);
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() {
    let app = setup();
    let (token, _) = register(&app, "Ann Lee", "ann@x.com").await;

    let (_, task) = send(
        &app,
        request(
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({ "title": "Buy milk", "description": "2 litres" })),
        ),
    )
    .await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        request("PUT", &uri, Some(&token), Some(json!({ "completed": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["title"], "Buy milk");
    assert_eq!(updated["description"], "2 litres");
    assert_eq!(updated["createdAt"], task["createdAt"]);

    let (status, body) = send(
        &app,
        request("PUT", &uri, Some(&token), Some(json!({ "completed": "yes" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "errors": [{ "field": "completed", "message": "Completed must be boolean" }] })
    );
}

#[tokio::test]
async fn explicit_null_fields_fail_type_rules() {
    let app = setup();
    let (token, _) = register(&app, "Ann Lee", "ann@x.com").await;
    let task = create_task(&app, &token, "Buy milk").await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &uri,
            Some(&token),
            Some(json!({ "description": null, "completed": null })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "errors": [
            { "field": "description", "message": "Description must be a string" },
            { "field": "completed", "message": "Completed must be boolean" }
        ] })
    );

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({ "title": "Walk dog", "description": null })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "errors": [{ "field": "description", "message": "Description must be a string" }] })
    );

    let (_, unchanged) = send(&app, request("GET", &uri, Some(&token), None)).await;
    assert_eq!(unchanged["completed"], false);
}

#[tokio::test]
async fn search_is_owner_scoped_case_insensitive_and_newest_first() {
    let app = setup();
    let (ann, _) = register(&app, "Ann Lee", "ann@x.com").await;
    let (bob, _) = register(&app, "Bob Ray", "bob@x.com").await;

    create_task(&app, &ann, "foo one").await;
    create_task(&app, &ann, "bar").await;
    create_task(&app, &bob, "foo for bob").await;
    create_task(&app, &ann, "Big FOO two").await;

    let (status, list) = send(&app, request("GET", "/api/tasks?q=foo", Some(&ann), None)).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Big FOO two", "foo one"]);

    let (_, all) = send(&app, request("GET", "/api/tasks", Some(&ann), None)).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn create_task_validates_title() {
    let app = setup();
    let (token, _) = register(&app, "Ann Lee", "ann@x.com").await;
    let (status, body) = send(
        &app,
        request("POST", "/api/tasks", Some(&token), Some(json!({ "title": " " }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "errors": [{ "field": "title", "message": "Title is required" }] })
    );
}

fn expired_token(user_id: &str) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let claims = json!({
        "sub": user_id,
        "email": "ann@x.com",
        "iat": now - 8 * 24 * 3600,
        "exp": now - 24 * 3600,
        "iss": "minitasks",
        "aud": "minitasks-users"
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn protected_routes_reject_bad_tokens_with_401() {
    let app = setup();
    let (_, user_id) = register(&app, "Ann Lee", "ann@x.com").await;
    let expired = expired_token(&user_id);
    let some_id = uuid::Uuid::new_v4();

    let routes = [
        ("GET", "/api/auth/profile".to_string(), None),
        ("PUT", "/api/auth/profile".to_string(), Some(json!({ "name": "Ann B" }))),
        ("POST", "/api/tasks".to_string(), Some(json!({ "title": "Buy milk" }))),
        ("GET", "/api/tasks".to_string(), None),
        ("GET", format!("/api/tasks/{some_id}"), None),
        ("PUT", format!("/api/tasks/{some_id}"), Some(json!({ "completed": true }))),
        ("DELETE", format!("/api/tasks/{some_id}"), None),
    ];

    for (method, uri, body) in routes {
        let (status, res) = send(&app, request(method, &uri, None, body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(res, json!({ "message": "No token provided" }));

        for bad in [expired.as_str(), "garbage", "a.b.c"] {
            let (status, res) = send(&app, request(method, &uri, Some(bad), body.clone())).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri} with {bad}");
            assert_eq!(res, json!({ "message": "Invalid token" }));
        }
    }
}

#[tokio::test]
async fn profile_read_and_rename() {
    let app = setup();
    let (token, user_id) = register(&app, "Ann Lee", "ann@x.com").await;

    let (status, body) = send(&app, request("GET", "/api/auth/profile", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id);
    assert_eq!(body["email"], "ann@x.com");
    assert!(body.get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            Some(json!({ "name": "Ann Brown" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "id": user_id, "name": "Ann Brown", "email": "ann@x.com" })
    );
}

#[tokio::test]
async fn token_for_unknown_user_gets_404_on_profile() {
    let app = setup();
    let keys = minitasks::auth::JwtKeys::new(&test_config().jwt);
    let token = keys.issue(uuid::Uuid::new_v4(), "ghost@x.com").unwrap();
    let (status, body) = send(&app, request("GET", "/api/auth/profile", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "User not found" }));
}

#[tokio::test]
async fn root_reports_ok() {
    let app = setup();
    let (status, body) = send(&app, request("GET", "/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}
