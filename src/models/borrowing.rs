use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "borrowings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub book_id: i32,
    pub student_id: i32,
    pub borrow_date: String,
    /// Agreed hand-back date. NULL means open-ended.
    pub due_date: Option<String>,
    /// Set once, when the book actually comes back.
    pub return_date: Option<String>,
    pub status: String, // 'active' or 'returned'; 'overdue' is derived
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// An active borrowing whose due date has passed.
    pub fn is_overdue_at(&self, now: &DateTime<Utc>) -> bool {
        if self.status != "active" {
            return false;
        }
        match &self.due_date {
            Some(due) => DateTime::parse_from_rfc3339(due)
                .map(|due| due < *now)
                .unwrap_or(false),
            None => false,
        }
    }
}
