use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use circdesk::api;
use circdesk::auth::{create_jwt, decode_jwt, hash_password, verify_password};
use circdesk::db;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serial_test::serial;
use tower::util::ServiceExt; // for `oneshot`

// JWT_SECRET is process-global state, so every test in this binary runs
// serialized.

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_user(db: &DatabaseConnection, email: &str, password: &str, role: &str) -> i32 {
    let hash = hash_password(password).unwrap();
    let user = circdesk::models::user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set(hash),
        first_name: Set("Casey".to_string()),
        last_name: Set("Tester".to_string()),
        student_number: Set(None),
        role: Set(role.to_string()),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        updated_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    };
    let res = circdesk::models::user::Entity::insert(user)
        .exec(db)
        .await
        .expect("Failed to create user");
    res.last_insert_id
}

#[tokio::test]
#[serial]
async fn test_password_hashing() {
    let password = "super_secret_password";
    let hash = hash_password(password).expect("Failed to hash password");

    assert_ne!(password, hash);
    assert!(verify_password(password, &hash).unwrap());
    assert!(!verify_password("wrong_password", &hash).unwrap());
}

#[tokio::test]
#[serial]
async fn test_jwt_creation_and_verification() {
    let token = create_jwt(42, "student@test.edu", "student").expect("Failed to create JWT");
    assert!(!token.is_empty());

    let claims = decode_jwt(&token).expect("Failed to verify JWT");
    assert_eq!(claims.sub, "42");
    assert_eq!(claims.user_id().unwrap(), 42);
    assert_eq!(claims.email, "student@test.edu");
    assert_eq!(claims.role, "student");
    assert!(!claims.is_admin());
}

#[tokio::test]
#[serial]
async fn test_jwt_rejected_after_secret_change() {
    unsafe { std::env::set_var("JWT_SECRET", "first-secret") };
    let token = create_jwt(7, "victim@test.edu", "student").unwrap();
    assert!(decode_jwt(&token).is_ok());

    unsafe { std::env::set_var("JWT_SECRET", "rotated-secret") };
    assert!(decode_jwt(&token).is_err());

    unsafe { std::env::remove_var("JWT_SECRET") };
}

#[tokio::test]
#[serial]
async fn test_login_flow() {
    let db = setup_test_db().await;

    // 1. Create a student account manually
    create_user(&db, "login@test.edu", "correct_password", "student").await;

    // 2. Setup Router (simulating main.rs)
    let app = Router::new()
        .route("/auth/login", axum::routing::post(api::auth::login))
        .with_state(db);

    // 3. Test Success Login
    let payload = serde_json::json!({
        "email": "login@test.edu",
        "password": "correct_password"
    });

    let req = Request::builder()
        .uri("/auth/login")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 4. Test Invalid Password
    let payload_bad = serde_json::json!({
        "email": "login@test.edu",
        "password": "wrong_password"
    });

    let req_bad = Request::builder()
        .uri("/auth/login")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload_bad).unwrap()))
        .unwrap();

    let response_bad = app.clone().oneshot(req_bad).await.unwrap();
    assert_eq!(response_bad.status(), StatusCode::UNAUTHORIZED);

    // 5. Test Non-existent User
    let payload_none = serde_json::json!({
        "email": "nobody@test.edu",
        "password": "password"
    });

    let req_none = Request::builder()
        .uri("/auth/login")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload_none).unwrap()))
        .unwrap();

    let response_none = app.oneshot(req_none).await.unwrap();
    assert_eq!(response_none.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_protected_routes_require_token() {
    let db = setup_test_db().await;
    let app = api::api_router(db);

    // No Authorization header
    let req = Request::builder()
        .uri("/books")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong scheme
    let req = Request::builder()
        .uri("/books")
        .method("GET")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token
    let req = Request::builder()
        .uri("/books")
        .method("GET")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_health_is_public() {
    let db = setup_test_db().await;
    let app = api::api_router(db);

    let req = Request::builder()
        .uri("/health")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[serial]
async fn test_admin_gate_on_book_management() {
    let db = setup_test_db().await;
    let student_id = create_user(&db, "plain@test.edu", "pw123456", "student").await;
    let admin_id = create_user(&db, "chief@test.edu", "pw123456", "admin").await;

    let app = api::api_router(db);

    let payload = serde_json::json!({
        "title": "Restricted",
        "author": "Someone",
        "category": "Test",
        "total_copies": 1
    });

    // Students cannot create books
    let student_jwt = create_jwt(student_id, "plain@test.edu", "student").unwrap();
    let req = Request::builder()
        .uri("/books")
        .method("POST")
        .header(header::AUTHORIZATION, format!("Bearer {}", student_jwt))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admins can
    let admin_jwt = create_jwt(admin_id, "chief@test.edu", "admin").unwrap();
    let req = Request::builder()
        .uri("/books")
        .method("POST")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin_jwt))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Students cannot delete either
    let req = Request::builder()
        .uri("/books/1")
        .method("DELETE")
        .header(header::AUTHORIZATION, format!("Bearer {}", student_jwt))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[serial]
async fn test_registration_always_creates_students() {
    // Role escalation must not be possible through the public form
    let db = setup_test_db().await;
    let app = api::api_router(db.clone());

    let payload = serde_json::json!({
        "email": "sneaky@test.edu",
        "password": "pw123456",
        "first_name": "Sneaky",
        "last_name": "Person",
        "role": "admin"
    });

    let req = Request::builder()
        .uri("/auth/register")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["user"]["role"], "student");
}
