// src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Repository, StoreError, UniqueField};
use crate::models::{Choice, NewQuestion, NewUser, Question, Session, User, UserVote, VoteOutcome};

#[derive(Default)]
struct Tables {
    questions: Vec<Question>,
    choices: Vec<Choice>,
    users: Vec<User>,
    user_votes: Vec<UserVote>,
    sessions: HashMap<Uuid, Session>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn username_taken(&self, username: &str, except: Option<i32>) -> bool {
        self.users
            .iter()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// Process-local store guarded by a single lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let tables = self.tables.lock().await;
        let mut questions = tables.questions.clone();
        questions.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(questions)
    }

    async fn get_question(&self, id: i32) -> Result<Option<Question>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn question_text_exists(&self, text: &str) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.questions.iter().any(|q| q.question_text == text))
    }

    async fn create_question(&self, new: NewQuestion) -> Result<Question, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables
            .questions
            .iter()
            .any(|q| q.question_text == new.question_text)
        {
            return Err(StoreError::Conflict(UniqueField::QuestionText));
        }

        let question = Question {
            id: tables.next_id(),
            question_text: new.question_text,
            question_description: new.question_description,
            question_image: new.question_image,
            pub_date: new.pub_date,
        };
        for choice_text in new.choices {
            let id = tables.next_id();
            tables.choices.push(Choice {
                id,
                question_id: question.id,
                choice_text,
                votes: 0,
            });
        }
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn choices_for(&self, question_id: i32) -> Result<Vec<Choice>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .choices
            .iter()
            .filter(|c| c.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn has_voted(&self, user_id: i32, question_id: i32) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .user_votes
            .iter()
            .any(|v| v.user_id == user_id && v.question_id == question_id))
    }

    async fn record_vote(
        &self,
        user_id: i32,
        question_id: i32,
        choice_id: i32,
    ) -> Result<VoteOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables
            .user_votes
            .iter()
            .any(|v| v.user_id == user_id && v.question_id == question_id)
        {
            return Ok(VoteOutcome::AlreadyVoted);
        }

        let Some(choice) = tables
            .choices
            .iter_mut()
            .find(|c| c.id == choice_id && c.question_id == question_id)
        else {
            return Ok(VoteOutcome::UnknownChoice);
        };
        choice.votes += 1;

        let id = tables.next_id();
        tables.user_votes.push(UserVote {
            id,
            user_id,
            question_id,
        });
        Ok(VoteOutcome::Recorded)
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn username_taken(&self, username: &str, except: Option<i32>) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.username_taken(username, except))
    }

    async fn email_taken(&self, email: &str, except: Option<i32>) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.email_taken(email, except))
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.username_taken(&new.username, None) {
            return Err(StoreError::Conflict(UniqueField::Username));
        }
        if tables.email_taken(&new.email, None) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }

        let user = User {
            id: tables.next_id(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            avatar: new.avatar,
            date_joined: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.username_taken(&user.username, Some(user.id)) {
            return Err(StoreError::Conflict(UniqueField::Username));
        }
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }

        let stored = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::Missing)?;
        stored.username = user.username.clone();
        stored.email = user.email.clone();
        stored.avatar = user.avatar.clone();
        Ok(stored.clone())
    }

    async fn delete_user(&self, id: i32) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.users.retain(|u| u.id != id);
        tables.user_votes.retain(|v| v.user_id != id);
        tables.sessions.retain(|_, s| s.user_id != id);
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.get(&id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables.lock().await.sessions.remove(&id);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}
