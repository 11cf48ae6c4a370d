//! Relational persistence for users, chats and messages.
//!
//! Every operation runs under the store's operation timeout; a timed-out
//! future is dropped, which returns its connection to the pool.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::models::{
    chat::{Chat, Message, Role},
    user::User,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("store operation `{0}` timed out")]
    Timeout(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Timeouts and driver failures may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout(_) | StoreError::Database(_))
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE,
        title TEXT NOT NULL DEFAULT 'New Chat',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE ON UPDATE CASCADE,
        role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
        content TEXT NOT NULL,
        language TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS chats_user_id_updated_at_idx ON chats(user_id, updated_at)",
    "CREATE INDEX IF NOT EXISTS messages_chat_id_created_at_idx ON messages(chat_id, created_at)",
];

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";
const CHAT_COLUMNS: &str = "id, user_id, title, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, chat_id, role, content, language, created_at";

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    op_timeout: Duration,
}

impl Store {
    pub fn new(pool: SqlitePool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Open a pool against `url`, creating the database file if needed.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        op_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(op_timeout)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool, op_timeout))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self, timeout: Duration) -> Result<(), StoreError> {
        let ping = async {
            sqlx::query_scalar::<_, i64>("SELECT 1")
                .fetch_one(&self.pool)
                .await
                .map(|_| ())
        };
        match tokio::time::timeout(timeout, ping).await {
            Ok(res) => res.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout("ping")),
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout(op)),
        }
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        self.bounded("create_user", async {
            sqlx::query_as::<_, User>(&format!(
                "INSERT INTO users (name, email, password_hash, created_at) VALUES (?, ?, ?, ?) RETURNING {USER_COLUMNS}"
            ))
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                    StoreError::DuplicateEmail
                } else {
                    StoreError::Database(e)
                }
            })
        })
        .await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        self.bounded("email_exists", async {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
            )
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
            Ok(exists != 0)
        })
        .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.bounded("get_user_by_email", async {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
        })
        .await
    }

    pub async fn create_chat(&self, user_id: i64, title: &str) -> Result<Chat, StoreError> {
        self.bounded("create_chat", async {
            let now = Utc::now();
            sqlx::query_as::<_, Chat>(&format!(
                "INSERT INTO chats (user_id, title, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING {CHAT_COLUMNS}"
            ))
            .bind(user_id)
            .bind(title)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_missing_parent)
        })
        .await
    }

    /// Chats owned by `user_id`, most recently updated first.
    pub async fn list_chats_by_user(&self, user_id: i64) -> Result<Vec<Chat>, StoreError> {
        self.bounded("list_chats_by_user", async {
            let chats = sqlx::query_as::<_, Chat>(&format!(
                "SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = ? ORDER BY updated_at DESC, id DESC"
            ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(chats)
        })
        .await
    }

    pub async fn get_chat_by_id(&self, id: i64) -> Result<Chat, StoreError> {
        self.bounded("get_chat_by_id", async {
            sqlx::query_as::<_, Chat>(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    pub async fn update_chat_title(&self, id: i64, title: &str) -> Result<(), StoreError> {
        self.bounded("update_chat_title", async {
            let result = sqlx::query("UPDATE chats SET title = ?, updated_at = ? WHERE id = ?")
                .bind(title)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    /// Append a message and bump the owning chat's `updated_at` in one
    /// transaction.
    pub async fn create_message(
        &self,
        chat_id: i64,
        role: Role,
        content: &str,
        language: Option<&str>,
    ) -> Result<Message, StoreError> {
        self.bounded("create_message", async {
            let now = Utc::now();
            let mut tx = self.pool.begin().await?;

            let message = sqlx::query_as::<_, Message>(&format!(
                "INSERT INTO messages (chat_id, role, content, language, created_at) VALUES (?, ?, ?, ?, ?) RETURNING {MESSAGE_COLUMNS}"
            ))
            .bind(chat_id)
            .bind(role)
            .bind(content)
            .bind(language.filter(|l| !l.is_empty()))
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_missing_parent)?;

            sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(chat_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(message)
        })
        .await
    }

    /// Messages of `chat_id` in the order they were written.
    pub async fn list_messages_by_chat(&self, chat_id: i64) -> Result<Vec<Message>, StoreError> {
        self.bounded("list_messages_by_chat", async {
            let messages = sqlx::query_as::<_, Message>(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = ? ORDER BY created_at ASC, id ASC"
            ))
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(messages)
        })
        .await
    }
}

// A foreign key violation on insert means the parent row is gone.
fn map_missing_parent(e: sqlx::Error) -> StoreError {
    if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
        StoreError::NotFound
    } else {
        StoreError::Database(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> Store {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        // One connection keeps the in-memory database alive for the whole test.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        let store = Store::new(pool, Duration::from_secs(5));
        store.migrate().await.unwrap();
        store
    }

    async fn tick() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = memory_store().await;
        assert!(!store.email_exists("ada@example.com").await.unwrap());

        store.create_user("Ada", "ada@example.com", "hash").await.unwrap();
        assert!(store.email_exists("ada@example.com").await.unwrap());

        let err = store
            .create_user("Ada Again", "ada@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = memory_store().await;
        assert!(matches!(
            store.get_user_by_email("nobody@example.com").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.get_chat_by_id(42).await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.update_chat_title(42, "x").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.create_message(42, Role::User, "hi", None).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.create_chat(42, "orphan").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn messages_come_back_in_write_order() {
        let store = memory_store().await;
        let user = store.create_user("Ada", "ada@example.com", "hash").await.unwrap();
        let chat = store.create_chat(user.id, "New Chat").await.unwrap();

        for content in ["first", "second", "third"] {
            store
                .create_message(chat.id, Role::User, content, Some("rust"))
                .await
                .unwrap();
            tick().await;
        }

        let messages = store.list_messages_by_chat(chat.id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(messages[0].language.as_deref(), Some("rust"));
    }

    #[tokio::test]
    async fn new_message_moves_chat_to_front() {
        let store = memory_store().await;
        let user = store.create_user("Ada", "ada@example.com", "hash").await.unwrap();
        let old = store.create_chat(user.id, "old").await.unwrap();
        tick().await;
        let new = store.create_chat(user.id, "new").await.unwrap();
        tick().await;

        let ids: Vec<_> = store
            .list_chats_by_user(user.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, [new.id, old.id]);

        store
            .create_message(old.id, Role::Assistant, "reply", None)
            .await
            .unwrap();

        let chats = store.list_chats_by_user(user.id).await.unwrap();
        assert_eq!(chats[0].id, old.id);
        assert!(chats[0].updated_at > old.updated_at);
    }

    #[tokio::test]
    async fn chats_are_scoped_to_their_owner() {
        let store = memory_store().await;
        let ada = store.create_user("Ada", "ada@example.com", "hash").await.unwrap();
        let bob = store.create_user("Bob", "bob@example.com", "hash").await.unwrap();
        store.create_chat(ada.id, "mine").await.unwrap();

        assert_eq!(store.list_chats_by_user(ada.id).await.unwrap().len(), 1);
        assert!(store.list_chats_by_user(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_language_is_stored_as_null() {
        let store = memory_store().await;
        let user = store.create_user("Ada", "ada@example.com", "hash").await.unwrap();
        let chat = store.create_chat(user.id, "New Chat").await.unwrap();

        let message = store
            .create_message(chat.id, Role::User, "hello", Some(""))
            .await
            .unwrap();
        assert_eq!(message.language, None);
        assert_eq!(message.role, Role::User);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out_as_transient() {
        let store = memory_store().await;
        let impatient = Store::new(store.pool().clone(), Duration::from_millis(200));
        let _held = store.pool().acquire().await.unwrap();

        let err = impatient.email_exists("ada@example.com").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout("email_exists")));
        assert!(err.is_transient());
    }
}
