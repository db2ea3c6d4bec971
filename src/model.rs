use crate::db::{Backend, Db};
use serde::Serialize;
use sqlx::FromRow;
use std::sync::Arc;

/// A model that owns one database table and knows how to bootstrap it.
#[async_trait::async_trait]
pub trait Model: Send + Sync {
    fn table_name() -> &'static str;
    fn create_table_sql(backend: Backend) -> String;

    /// Create the table if it does not exist yet. Runs once per process
    /// start, not per request.
    async fn ensure_table(db: Arc<Db>) -> Result<(), sqlx::Error> {
        db.execute(&Self::create_table_sql(db.backend())).await?;
        log::info!("Table `{}` ready.", Self::table_name());
        Ok(())
    }
}

/// A single stored text entry with an auto-assigned identifier.
///
/// Never updated or deleted through the HTTP surface; rows persist until
/// someone removes them by hand.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub message: String,
}

impl Model for Message {
    fn table_name() -> &'static str {
        "messages"
    }

    // NOT NULL is all the database enforces; the non-empty check lives in
    // the submission handler.
    fn create_table_sql(backend: Backend) -> String {
        let id_column = match backend {
            Backend::MySql => "BIGINT AUTO_INCREMENT PRIMARY KEY",
            Backend::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id {},
                message TEXT NOT NULL
            )",
            Self::table_name(),
            id_column
        )
    }
}

impl Message {
    /// Fetch every message, newest first. No pagination or limit.
    pub async fn all_desc(db: &Db) -> Result<Vec<Message>, sqlx::Error> {
        db.fetch_all("SELECT id, message FROM messages ORDER BY id DESC")
            .await
    }

    /// Insert a new message exactly as submitted, untrimmed.
    pub async fn insert(db: &Db, text: &str) -> Result<(), sqlx::Error> {
        db.execute_with("INSERT INTO messages (message) VALUES (?)", &[text])
            .await
    }
}
