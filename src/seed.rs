use crate::auth::hash_password;
use crate::models::{book, borrowing, user};
use chrono::{Duration, Utc};
use sea_orm::*;

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    // 1. Demo accounts
    let admin_password = hash_password("admin123").unwrap();
    let student_password = hash_password("student123").unwrap();

    let admin = user::ActiveModel {
        email: Set("admin@library.edu".to_owned()),
        password_hash: Set(admin_password),
        first_name: Set("Alice".to_owned()),
        last_name: Set("Admin".to_owned()),
        student_number: Set(None),
        role: Set("admin".to_owned()),
        created_at: Set(Utc::now().to_rfc3339()),
        updated_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };

    let student = user::ActiveModel {
        email: Set("student@library.edu".to_owned()),
        password_hash: Set(student_password),
        first_name: Set("Sam".to_owned()),
        last_name: Set("Student".to_owned()),
        student_number: Set(Some("ST101".to_owned())),
        role: Set("student".to_owned()),
        created_at: Set(Utc::now().to_rfc3339()),
        updated_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };

    user::Entity::insert(admin)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await?;

    user::Entity::insert(student)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await?;

    // 2. Catalogue, only while the shelf is still empty so a restart never
    // duplicates it
    let book_count = book::Entity::find().count(db).await?;
    if book_count > 0 {
        tracing::info!("Books already present, skipping catalogue seed");
        return Ok(());
    }

    let catalogue = vec![
        ("The Algorithm Design Manual", "Steven S. Skiena", "Computer Science", 2008, 3),
        ("Dune", "Frank Herbert", "Science Fiction", 1965, 5),
        ("The Lord of the Rings", "J.R.R. Tolkien", "Fantasy", 1954, 2),
        ("The Great Gatsby", "F. Scott Fitzgerald", "Classic", 1925, 4),
        ("To Kill a Mockingbird", "Harper Lee", "Classic", 1960, 4),
        ("Pride and Prejudice", "Jane Austen", "Classic", 1813, 3),
    ];

    for (title, author, category, year, copies) in catalogue {
        let entry = book::ActiveModel {
            title: Set(title.to_owned()),
            author: Set(author.to_owned()),
            category: Set(category.to_owned()),
            publish_year: Set(Some(year)),
            total_copies: Set(copies),
            available_copies: Set(copies),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };
        book::Entity::insert(entry).exec(db).await?;
    }

    // 3. Sample borrowings for the demo student, one per state: current,
    // past due, and returned
    let demo_student = user::Entity::find()
        .filter(user::Column::Email.eq("student@library.edu"))
        .one(db)
        .await?;

    let Some(demo_student) = demo_student else {
        return Ok(());
    };

    let now = Utc::now();
    let samples = vec![
        // (title, borrowed, due, returned)
        (
            "The Great Gatsby",
            now - Duration::days(2),
            Some(now + Duration::days(12)),
            None,
        ),
        (
            "To Kill a Mockingbird",
            now - Duration::days(10),
            Some(now - Duration::days(3)),
            None,
        ),
        (
            "Pride and Prejudice",
            now - Duration::days(30),
            Some(now - Duration::days(16)),
            Some(now - Duration::days(20)),
        ),
    ];

    for (title, borrowed, due, returned) in samples {
        let Some(target) = book::Entity::find()
            .filter(book::Column::Title.eq(title))
            .one(db)
            .await?
        else {
            continue;
        };

        let status = if returned.is_some() { "returned" } else { "active" };

        let record = borrowing::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            book_id: Set(target.id),
            student_id: Set(demo_student.id),
            borrow_date: Set(borrowed.to_rfc3339()),
            due_date: Set(due.map(|d| d.to_rfc3339())),
            return_date: Set(returned.map(|d| d.to_rfc3339())),
            status: Set(status.to_owned()),
            created_at: Set(borrowed.to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
        };
        borrowing::Entity::insert(record).exec(db).await?;

        // Keep the shelf count honest for copies still out
        if returned.is_none() {
            let mut active: book::ActiveModel = target.clone().into();
            active.available_copies = Set(target.available_copies - 1);
            active.updated_at = Set(Utc::now().to_rfc3339());
            active.update(db).await?;
        }
    }

    Ok(())
}
