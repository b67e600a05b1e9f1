// src/store/mod.rs
//! Persistence behind the web handlers.
//!
//! [`PgStore`] is the production backend. [`MemoryStore`] keeps everything in
//! process and is used when no `DATABASE_URL` is configured, and by the tests.
//! Both enforce the same uniqueness rules: one username, one email, one
//! question text, one vote per user and question.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Choice, NewQuestion, NewUser, Question, Session, User, VoteOutcome};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Column whose uniqueness a write violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
    QuestionText,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unique constraint violated on {0:?}")]
    Conflict(UniqueField),

    #[error("record not found")]
    Missing,
}

#[async_trait]
pub trait Repository: Send + Sync {
    /// All questions, newest first.
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError>;
    async fn get_question(&self, id: i32) -> Result<Option<Question>, StoreError>;
    async fn question_text_exists(&self, text: &str) -> Result<bool, StoreError>;
    /// Inserts the question and its choices together.
    async fn create_question(&self, new: NewQuestion) -> Result<Question, StoreError>;
    /// Choices of a question in creation order.
    async fn choices_for(&self, question_id: i32) -> Result<Vec<Choice>, StoreError>;

    async fn has_voted(&self, user_id: i32, question_id: i32) -> Result<bool, StoreError>;
    /// Atomically bumps the choice counter and records the user's vote.
    /// Nothing is written unless the outcome is [`VoteOutcome::Recorded`].
    async fn record_vote(
        &self,
        user_id: i32,
        question_id: i32,
        choice_id: i32,
    ) -> Result<VoteOutcome, StoreError>;

    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn username_taken(&self, username: &str, except: Option<i32>) -> Result<bool, StoreError>;
    async fn email_taken(&self, email: &str, except: Option<i32>) -> Result<bool, StoreError>;
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;
    /// Persists username, email and avatar of an existing user.
    async fn update_user(&self, user: &User) -> Result<User, StoreError>;
    /// Removes the user along with their votes and sessions.
    async fn delete_user(&self, id: i32) -> Result<(), StoreError>;

    async fn create_session(&self, session: &Session) -> Result<(), StoreError>;
    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError>;
    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError>;
    /// Deletes sessions that expired before `now`, returning how many went.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
