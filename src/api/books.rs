use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::models::book::{self, Entity as Book};
use crate::models::borrowing::{self, Entity as Borrowing};

#[derive(Deserialize)]
pub struct ListBooksQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/books",
    responses(
        (status = 200, description = "All books, ordered by title"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_books(
    _claims: Claims,
    State(db): State<DatabaseConnection>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut condition = Condition::all();

    if let Some(category) = query.category.filter(|c| !c.is_empty()) {
        condition = condition.add(book::Column::Category.eq(category));
    }

    if let Some(q) = query.q.filter(|q| !q.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(book::Column::Title.contains(&q))
                .add(book::Column::Author.contains(&q)),
        );
    }

    let books = Book::find()
        .filter(condition)
        .order_by_asc(book::Column::Title)
        .all(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    Ok(Json(json!({
        "total": books.len(),
        "books": books
    })))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(
        ("id" = i32, Path, description = "Book id")
    ),
    responses(
        (status = 200, description = "The requested book"),
        (status = 404, description = "No book with this id")
    )
)]
pub async fn get_book(
    _claims: Claims,
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let book = Book::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Book not found" })),
        ))?;

    Ok(Json(json!({ "book": book })))
}

#[derive(Deserialize)]
pub struct CreateBookRequest {
    title: String,
    author: String,
    category: String,
    #[serde(default)]
    publish_year: Option<i32>,
    total_copies: i32,
}

pub async fn create_book(
    claims: Claims,
    State(db): State<DatabaseConnection>,
    Json(payload): Json<CreateBookRequest>,
) -> impl IntoResponse {
    if !claims.is_admin() {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin role required" })),
        )
            .into_response();
    }

    if payload.title.trim().is_empty() || payload.author.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Title and author are required" })),
        )
            .into_response();
    }

    if payload.total_copies < 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "total_copies cannot be negative" })),
        )
            .into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let new_book = book::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        author: Set(payload.author.trim().to_string()),
        category: Set(payload.category.trim().to_string()),
        publish_year: Set(payload.publish_year),
        total_copies: Set(payload.total_copies),
        available_copies: Set(payload.total_copies),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_book.insert(&db).await {
        Ok(model) => {
            tracing::info!("Book created: {} ({})", model.title, model.id);
            (
                StatusCode::CREATED,
                Json(json!({
                    "message": "Book created successfully",
                    "book": model
                })),
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

#[derive(Deserialize)]
pub struct UpdateBookRequest {
    title: Option<String>,
    author: Option<String>,
    category: Option<String>,
    publish_year: Option<i32>,
    total_copies: Option<i32>,
}

pub async fn update_book(
    claims: Claims,
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBookRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin role required" })),
        ));
    }

    let book = Book::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Book not found" })),
        ))?;

    let mut active: book::ActiveModel = book.clone().into();

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Title cannot be empty" })),
            ));
        }
        active.title = Set(title.trim().to_string());
    }
    if let Some(author) = payload.author {
        if author.trim().is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Author cannot be empty" })),
            ));
        }
        active.author = Set(author.trim().to_string());
    }
    if let Some(category) = payload.category {
        active.category = Set(category.trim().to_string());
    }
    if let Some(publish_year) = payload.publish_year {
        active.publish_year = Set(Some(publish_year));
    }

    // Changing total_copies shifts available_copies by the same amount, so
    // copies already out on loan stay accounted for.
    if let Some(total_copies) = payload.total_copies {
        if total_copies < 0 {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "total_copies cannot be negative" })),
            ));
        }
        let new_available = book.available_copies + (total_copies - book.total_copies);
        if new_available < 0 {
            return Err((
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "Cannot reduce total_copies below the number of copies on loan"
                })),
            ));
        }
        active.total_copies = Set(total_copies);
        active.available_copies = Set(new_available);
    }

    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    let updated = active.update(&db).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(Json(json!({
        "message": "Book updated successfully",
        "book": updated
    })))
}

pub async fn delete_book(
    claims: Claims,
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin role required" })),
        ));
    }

    // Refuse while copies are still out, otherwise the cascade would erase
    // the active borrowing records.
    let active_count = Borrowing::find()
        .filter(borrowing::Column::BookId.eq(id))
        .filter(borrowing::Column::Status.eq("active"))
        .count(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    if active_count > 0 {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "Book has active borrowings" })),
        ));
    }

    Book::delete_by_id(id).exec(&db).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(Json(json!({ "message": "Book deleted successfully" })))
}
