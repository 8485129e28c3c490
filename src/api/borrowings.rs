use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::Claims;
use crate::models::book::{self, Entity as Book};
use crate::models::borrowing::{self, Entity as Borrowing};
use crate::models::user::{self, Entity as User};

#[derive(Deserialize)]
pub struct ListBorrowingsQuery {
    pub status: Option<String>,
    pub book_id: Option<i32>,
    pub student_id: Option<i32>,
}

pub async fn list_borrowings(
    claims: Claims,
    State(db): State<DatabaseConnection>,
    Query(query): Query<ListBorrowingsQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let caller_id = claims.user_id()?;

    let mut condition = Condition::all();

    // Students only ever see their own records. Admins see everything and
    // may narrow by student.
    if !claims.is_admin() {
        condition = condition.add(borrowing::Column::StudentId.eq(caller_id));
    } else if let Some(student_id) = query.student_id {
        condition = condition.add(borrowing::Column::StudentId.eq(student_id));
    }

    if let Some(book_id) = query.book_id {
        condition = condition.add(borrowing::Column::BookId.eq(book_id));
    }

    // 'overdue' is derived, not stored: it means active and past due.
    let mut overdue_only = false;
    if let Some(status) = query.status.filter(|s| !s.is_empty()) {
        if status == "overdue" {
            overdue_only = true;
            condition = condition.add(borrowing::Column::Status.eq("active"));
        } else {
            condition = condition.add(borrowing::Column::Status.eq(status));
        }
    }

    let rows = Borrowing::find()
        .filter(condition)
        .order_by_desc(borrowing::Column::CreatedAt)
        .find_also_related(Book)
        .all(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    // Collect borrower ids to fetch names in one query
    let student_ids: Vec<i32> = rows.iter().map(|(b, _)| b.student_id).collect();

    let mut student_map = HashMap::new();

    if !student_ids.is_empty() {
        let students = User::find()
            .filter(user::Column::Id.is_in(student_ids))
            .all(&db)
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
            })?;

        for student in students {
            student_map.insert(student.id, student);
        }
    }

    let now = Utc::now();

    let result: Vec<Value> = rows
        .into_iter()
        .filter(|(b, _)| !overdue_only || b.is_overdue_at(&now))
        .map(|(b, book)| {
            let student = student_map.get(&b.student_id);
            let student_name = student
                .map(|s| s.full_name())
                .unwrap_or("Unknown".to_string());

            json!({
                "id": b.id,
                "book_id": b.book_id,
                "student_id": b.student_id,
                "borrow_date": b.borrow_date,
                "due_date": b.due_date,
                "return_date": b.return_date,
                "status": b.status,
                "overdue": b.is_overdue_at(&now),
                "student_name": student_name,
                "student_number": student.and_then(|s| s.student_number.clone()),
                "book": book.map(|bk| json!({
                    "id": bk.id,
                    "title": bk.title,
                    "author": bk.author,
                    "category": bk.category,
                    "publish_year": bk.publish_year,
                })),
            })
        })
        .collect();

    Ok(Json(json!({ "borrowings": result })))
}

#[derive(Deserialize)]
pub struct BorrowRequest {
    pub book_id: i32,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/borrowings",
    responses(
        (status = 201, description = "Borrowing created, one copy taken off the shelf"),
        (status = 404, description = "No book with this id"),
        (status = 409, description = "No copies available")
    )
)]
pub async fn borrow_book(
    claims: Claims,
    State(db): State<DatabaseConnection>,
    Json(payload): Json<BorrowRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let student_id = claims.user_id()?;

    if let Some(due_date) = &payload.due_date {
        if chrono::DateTime::parse_from_rfc3339(due_date).is_err() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "due_date must be an RFC 3339 timestamp" })),
            ));
        }
    }

    let now = Utc::now().to_rfc3339();

    let txn = db.begin().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    // 1. Take one copy off the shelf. The WHERE clause only matches while
    // stock remains, so the counter can never go below zero.
    let claimed = Book::update_many()
        .col_expr(
            book::Column::AvailableCopies,
            Expr::col(book::Column::AvailableCopies).sub(1),
        )
        .col_expr(book::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(book::Column::Id.eq(payload.book_id))
        .filter(book::Column::AvailableCopies.gt(0))
        .exec(&txn)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    if claimed.rows_affected == 0 {
        // Either the book does not exist, or the shelf is empty
        let book_exists = Book::find_by_id(payload.book_id)
            .one(&txn)
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
            })?
            .is_some();

        return Err(if book_exists {
            (
                StatusCode::CONFLICT,
                Json(json!({ "error": "This book is not available for borrowing" })),
            )
        } else {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Book not found" })),
            )
        });
    }

    // 2. Record the borrowing
    let new_borrowing = borrowing::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        book_id: Set(payload.book_id),
        student_id: Set(student_id),
        borrow_date: Set(now.clone()),
        due_date: Set(payload.due_date),
        return_date: Set(None),
        status: Set("active".to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    };

    let saved = new_borrowing.insert(&txn).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    txn.commit().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    tracing::info!(
        "Student {} borrowed book {} (borrowing {})",
        student_id,
        payload.book_id,
        saved.id
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "borrowing": saved,
            "message": "Book borrowed successfully"
        })),
    ))
}

#[utoipa::path(
    put,
    path = "/api/borrowings/{id}/return",
    params(
        ("id" = String, Path, description = "Borrowing id")
    ),
    responses(
        (status = 200, description = "Borrowing closed, copy back on the shelf"),
        (status = 403, description = "Not the caller's borrowing"),
        (status = 404, description = "No borrowing with this id"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    claims: Claims,
    State(db): State<DatabaseConnection>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let caller_id = claims.user_id()?;
    let now = Utc::now().to_rfc3339();

    let txn = db.begin().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    // 1. Find the borrowing
    let record = Borrowing::find_by_id(id.clone())
        .one(&txn)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Borrowing not found" })),
        ))?;

    if record.student_id != caller_id && !claims.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You can only return your own borrowings" })),
        ));
    }

    // 2. Close it, unless someone already did. The status guard makes a
    // double return a no-op at the SQL level.
    let closed = Borrowing::update_many()
        .col_expr(borrowing::Column::Status, Expr::value("returned"))
        .col_expr(borrowing::Column::ReturnDate, Expr::value(now.clone()))
        .col_expr(borrowing::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(borrowing::Column::Id.eq(&id))
        .filter(borrowing::Column::Status.ne("returned"))
        .exec(&txn)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    if closed.rows_affected == 0 {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "Borrowing is already returned" })),
        ));
    }

    // 3. Put the copy back, capped at total_copies.
    let restocked = Book::update_many()
        .col_expr(
            book::Column::AvailableCopies,
            Expr::col(book::Column::AvailableCopies).add(1),
        )
        .col_expr(book::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(book::Column::Id.eq(record.book_id))
        .filter(Expr::col(book::Column::AvailableCopies).lt(Expr::col(book::Column::TotalCopies)))
        .exec(&txn)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    if restocked.rows_affected == 0 {
        tracing::warn!(
            "Book {} already at full stock while closing borrowing {}",
            record.book_id,
            id
        );
    }

    txn.commit().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let updated = Borrowing::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    Ok(Json(json!({
        "borrowing": updated,
        "message": "Book returned successfully"
    })))
}

pub async fn book_history(
    claims: Claims,
    State(db): State<DatabaseConnection>,
    Path(book_id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !claims.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin role required" })),
        ));
    }

    let book = Book::find_by_id(book_id)
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

    let rows = Borrowing::find()
        .filter(borrowing::Column::BookId.eq(book_id))
        .order_by_desc(borrowing::Column::CreatedAt)
        .find_also_related(User)
        .all(&db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    let now = Utc::now();

    let history: Vec<Value> = rows
        .into_iter()
        .map(|(b, student)| {
            json!({
                "id": b.id,
                "student_id": b.student_id,
                "borrow_date": b.borrow_date,
                "due_date": b.due_date,
                "return_date": b.return_date,
                "status": b.status,
                "overdue": b.is_overdue_at(&now),
                "student_name": student.as_ref().map(|s| s.full_name()),
                "student_number": student.and_then(|s| s.student_number),
            })
        })
        .collect();

    Ok(Json(json!({
        "book": {
            "id": book.id,
            "title": book.title,
            "author": book.author,
        },
        "history": history
    })))
}
