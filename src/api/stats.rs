use axum::{extract::State, http::StatusCode, Json};
use sea_orm::*;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::models::book::Entity as Book;
use crate::models::borrowing::{self, Entity as Borrowing};

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Dashboard counters"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn dashboard_stats(
    _claims: Claims,
    State(db): State<DatabaseConnection>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let books = Book::find().all(&db).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let total_books = books.len();
    let total_copies: i64 = books.iter().map(|b| b.total_copies as i64).sum();
    let available_copies: i64 = books.iter().map(|b| b.available_copies as i64).sum();

    let active_borrowings = Borrowing::find()
        .filter(borrowing::Column::Status.eq("active"))
        .count(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    Ok(Json(json!({
        "total_books": total_books,
        "total_copies": total_copies,
        "available_copies": available_copies,
        "active_borrowings": active_borrowings,
    })))
}
