// src/store/postgres.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Repository, StoreError, UniqueField};
use crate::models::{Choice, NewQuestion, NewUser, Question, Session, User, VoteOutcome};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps unique violations onto the column they guard.
fn conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            match db.constraint() {
                Some("users_username_key") => return StoreError::Conflict(UniqueField::Username),
                Some("users_email_key") => return StoreError::Conflict(UniqueField::Email),
                Some("questions_question_text_key") => {
                    return StoreError::Conflict(UniqueField::QuestionText)
                }
                _ => {}
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Repository for PgStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let questions =
            sqlx::query_as::<_, Question>("SELECT * FROM questions ORDER BY pub_date DESC, id DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(questions)
    }

    async fn get_question(&self, id: i32) -> Result<Option<Question>, StoreError> {
        let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(question)
    }

    async fn question_text_exists(&self, text: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM questions WHERE question_text = $1)")
                .bind(text)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_question(&self, new: NewQuestion) -> Result<Question, StoreError> {
        let mut tx = self.pool.begin().await?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (question_text, question_description, question_image, pub_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&new.question_text)
        .bind(&new.question_description)
        .bind(&new.question_image)
        .bind(new.pub_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict)?;

        for choice_text in &new.choices {
            sqlx::query("INSERT INTO choices (question_id, choice_text, votes) VALUES ($1, $2, 0)")
                .bind(question.id)
                .bind(choice_text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(question)
    }

    async fn choices_for(&self, question_id: i32) -> Result<Vec<Choice>, StoreError> {
        let choices =
            sqlx::query_as::<_, Choice>("SELECT * FROM choices WHERE question_id = $1 ORDER BY id")
                .bind(question_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(choices)
    }

    async fn has_voted(&self, user_id: i32, question_id: i32) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_votes WHERE user_id = $1 AND question_id = $2)",
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn record_vote(
        &self,
        user_id: i32,
        question_id: i32,
        choice_id: i32,
    ) -> Result<VoteOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The unique (user_id, question_id) pair turns a concurrent second vote into a no-op.
        let inserted: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO user_votes (user_id, question_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, question_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            tx.rollback().await?;
            return Ok(VoteOutcome::AlreadyVoted);
        }

        let updated = sqlx::query(
            "UPDATE choices SET votes = votes + 1 WHERE id = $1 AND question_id = $2",
        )
        .bind(choice_id)
        .bind(question_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(VoteOutcome::UnknownChoice);
        }

        tx.commit().await?;
        Ok(VoteOutcome::Recorded)
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn username_taken(&self, username: &str, except: Option<i32>) -> Result<bool, StoreError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::INT IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn email_taken(&self, email: &str, except: Option<i32>) -> Result<bool, StoreError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::INT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, avatar)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.avatar)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict)
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET username = $2, email = $3, avatar = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.avatar)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict)?
        .ok_or(StoreError::Missing)
    }

    async fn delete_user(&self, id: i32) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(purged.rows_affected())
    }
}
