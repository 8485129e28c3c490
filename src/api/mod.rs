pub mod auth;
pub mod books;
pub mod borrowings;
pub mod health;
pub mod stats;

use axum::{
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;

pub fn api_router(db: DatabaseConnection) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::get_me))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:id/history", get(borrowings::book_history))
        // Borrowings
        .route(
            "/borrowings",
            get(borrowings::list_borrowings).post(borrowings::borrow_book),
        )
        .route("/borrowings/:id/return", put(borrowings::return_book))
        // Dashboard
        .route("/stats", get(stats::dashboard_stats))
        .with_state(db)
}
