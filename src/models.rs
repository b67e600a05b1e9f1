// src/models.rs
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minutes a question stays open after publication.
pub const EXPIRATION_MINUTES: i64 = 10;

/// Upper bound for question and choice texts.
pub const MAX_TEXT_LEN: usize = 200;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: i32,
    pub question_text: String,
    pub question_description: Option<String>,
    pub question_image: Option<String>,
    pub pub_date: DateTime<Utc>,
}

impl Question {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.pub_date + TimeDelta::minutes(EXPIRATION_MINUTES)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        self.pub_date >= now - TimeDelta::days(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Choice {
    pub id: i32,
    pub question_id: i32,
    pub choice_text: String,
    pub votes: i32,
}

impl Choice {
    /// Share of `total` held by this choice, in percent.
    pub fn percentage(&self, total: i64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.votes as f64 / total as f64 * 100.0
    }
}

pub fn total_votes(choices: &[Choice]) -> i64 {
    choices.iter().map(|c| i64::from(c.votes)).sum()
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub avatar: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserVote {
    pub id: i32,
    pub user_id: i32,
    pub question_id: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_description: Option<String>,
    pub question_image: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
}

/// Result of an attempt to record a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    AlreadyVoted,
    UnknownChoice,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(pub_date: DateTime<Utc>) -> Question {
        Question {
            id: 1,
            question_text: "What's up?".to_string(),
            question_description: None,
            question_image: None,
            pub_date,
        }
    }

    fn choice(votes: i32) -> Choice {
        Choice {
            id: 1,
            question_id: 1,
            choice_text: "Not much".to_string(),
            votes,
        }
    }

    #[test]
    fn percentage_is_zero_without_votes() {
        assert_eq!(choice(0).percentage(0), 0.0);
        assert_eq!(choice(3).percentage(0), 0.0);
    }

    #[test]
    fn percentage_is_share_of_total() {
        let choices = vec![choice(1), choice(3)];
        let total = total_votes(&choices);
        assert_eq!(total, 4);
        assert_eq!(choices[0].percentage(total), 25.0);
        assert_eq!(choices[1].percentage(total), 75.0);
    }

    #[test]
    fn recently_published_within_a_day() {
        let now = Utc::now();
        assert!(question(now - TimeDelta::hours(23)).was_published_recently(now));
        assert!(!question(now - TimeDelta::days(1) - TimeDelta::seconds(1)).was_published_recently(now));
    }

    #[test]
    fn question_expires_ten_minutes_after_publication() {
        let now = Utc::now();
        let q = question(now);
        assert_eq!(q.expires_at(), now + TimeDelta::minutes(10));
        assert!(!q.is_expired(now + TimeDelta::minutes(9)));
        assert!(q.is_expired(now + TimeDelta::minutes(10)));
    }
}
