use crate::auth::{create_jwt, hash_password, verify_password, Claims};
use crate::models::user::{self, Entity as User};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    #[serde(default)]
    student_number: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn register(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() || !email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "A valid email address is required" })),
        )
            .into_response();
    }

    if payload.password.len() < 6 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Password must be at least 6 characters" })),
        )
            .into_response();
    }

    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "First and last name are required" })),
        )
            .into_response();
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to create account" })),
            )
                .into_response();
        }
    };

    let now = chrono::Utc::now().to_rfc3339();
    let new_user = user::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        student_number: Set(payload.student_number),
        role: Set("student".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_user.insert(&db).await {
        Ok(saved) => {
            tracing::info!("Registered new student account: {}", saved.email);
            let token = match create_jwt(saved.id, &saved.email, &saved.role) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to issue token: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Failed to issue token" })),
                    )
                        .into_response();
                }
            };
            (
                StatusCode::CREATED,
                Json(json!({ "token": token, "user": saved })),
            )
                .into_response()
        }
        // The UNIQUE index on email is the authority on duplicates, so a
        // racing second register lands here rather than slipping through a
        // read-then-insert window.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            tracing::warn!("Registration rejected, email already taken: {}", email);
            (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Email already registered" })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let email = payload.email.trim().to_lowercase();
    tracing::info!("Login attempt for: {}", email);

    let user = match User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&db)
        .await
    {
        Ok(Some(u)) => u,
        _ => {
            tracing::warn!("No account for: {}", email);
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response();
        }
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {
            tracing::info!("Password verified for: {}", user.email);
            let token = match create_jwt(user.id, &user.email, &user.role) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to issue token: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Failed to issue token" })),
                    )
                        .into_response();
                }
            };
            (StatusCode::OK, Json(json!({ "token": token, "user": user }))).into_response()
        }
        _ => {
            tracing::warn!("Password verification failed for: {}", user.email);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response()
        }
    }
}

// Tokens are stateless, so logout is just an acknowledgement. The client
// drops its copy of the token.
pub async fn logout(claims: Claims) -> impl IntoResponse {
    tracing::info!("User signed out: {}", claims.email);
    (StatusCode::OK, Json(json!({ "message": "Signed out" })))
}

pub async fn get_me(claims: Claims, State(db): State<DatabaseConnection>) -> impl IntoResponse {
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };

    match User::find_by_id(user_id).one(&db).await {
        Ok(Some(user)) => (StatusCode::OK, Json(json!({ "user": user }))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
