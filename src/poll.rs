// src/poll.rs
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{
    media::{MediaError, MediaKind, Upload},
    models::{total_votes, Choice, NewQuestion, Question, User, VoteOutcome, MAX_TEXT_LEN},
    state::State,
    store::{StoreError, UniqueField},
};

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("Вы должны зарегистрироваться для голосований")]
    Anonymous,

    #[error("Вы уже голосовали в этом опросе")]
    AlreadyVoted,

    #[error("вы не сделали выбор")]
    NoChoice,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Введите текст вопроса")]
    MissingText,

    #[error("Текст вопроса не длиннее 200 символов")]
    TextTooLong,

    #[error("Вариант ответа не длиннее 200 символов")]
    ChoiceTooLong,

    #[error("Пост с таким именем уже существует")]
    DuplicateQuestion,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PollError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(UniqueField::QuestionText) => PollError::DuplicateQuestion,
            other => PollError::Store(other),
        }
    }
}

impl PollError {
    /// Whether the message should be shown on the form rather than as a server error.
    pub fn is_user_facing(&self) -> bool {
        match self {
            PollError::Store(_) => false,
            PollError::Media(err) => err.is_user_facing(),
            _ => true,
        }
    }
}

/// Submitted question form.
#[derive(Debug, Default)]
pub struct QuestionDraft {
    pub question_text: Option<String>,
    pub question_description: Option<String>,
    pub question_image: Option<Upload>,
    pub choices: Vec<String>,
}

/// Trims choice texts and drops the blank ones.
pub fn clean_choices(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|choice| choice.trim())
        .filter(|choice| !choice.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn create_question(state: &State, draft: QuestionDraft) -> Result<Question, PollError> {
    let question_text = draft.question_text.ok_or(PollError::MissingText)?;
    if question_text.chars().count() > MAX_TEXT_LEN {
        return Err(PollError::TextTooLong);
    }
    let choices = clean_choices(&draft.choices);
    if choices.iter().any(|choice| choice.chars().count() > MAX_TEXT_LEN) {
        return Err(PollError::ChoiceTooLong);
    }
    if state.store.question_text_exists(&question_text).await? {
        return Err(PollError::DuplicateQuestion);
    }

    let question_image = match &draft.question_image {
        Some(upload) => Some(state.media.save(MediaKind::QuestionImage, upload).await?),
        None => None,
    };

    let new = NewQuestion {
        question_text,
        question_description: draft.question_description,
        question_image: question_image.clone(),
        pub_date: Utc::now(),
        choices,
    };
    let question = match state.store.create_question(new).await {
        Ok(question) => question,
        Err(err) => {
            if let Some(image) = question_image {
                state.media.remove(&image).await;
            }
            return Err(err.into());
        }
    };

    info!(question = question.id, "Question created");
    Ok(question)
}

/// Validates and records a vote of `user` on `question`.
///
/// `choice` is the raw form value; anything that is not the id of one of the
/// question's choices counts as no choice at all.
pub async fn cast_vote(
    state: &State,
    user: Option<&User>,
    question: &Question,
    choice: Option<&str>,
) -> Result<(), VoteError> {
    let user = user.ok_or(VoteError::Anonymous)?;
    if state.store.has_voted(user.id, question.id).await? {
        return Err(VoteError::AlreadyVoted);
    }
    let choice_id = choice
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .ok_or(VoteError::NoChoice)?;

    match state.store.record_vote(user.id, question.id, choice_id).await? {
        VoteOutcome::Recorded => {
            info!(user = user.id, question = question.id, choice = choice_id, "Vote recorded");
            Ok(())
        }
        VoteOutcome::AlreadyVoted => Err(VoteError::AlreadyVoted),
        VoteOutcome::UnknownChoice => Err(VoteError::NoChoice),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceResult {
    pub choice_text: String,
    pub votes: i32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollResults {
    pub total_votes: i64,
    pub choices: Vec<ChoiceResult>,
}

pub fn results(choices: &[Choice]) -> PollResults {
    let total = total_votes(choices);
    PollResults {
        total_votes: total,
        choices: choices
            .iter()
            .map(|choice| ChoiceResult {
                choice_text: choice.choice_text.clone(),
                votes: choice.votes,
                percentage: choice.percentage(total),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, models::NewUser, state::State, store::MemoryStore};

    fn state(media: &std::path::Path) -> std::sync::Arc<State> {
        let config = Config {
            media_root: media.to_path_buf(),
            ..Config::default()
        };
        State::with_store(config, Box::new(MemoryStore::new()))
    }

    async fn user(state: &State, name: &str) -> User {
        state
            .store
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: "hash".to_string(),
                avatar: "avatars/x.png".to_string(),
            })
            .await
            .unwrap()
    }

    fn draft(text: &str, choices: &[&str]) -> QuestionDraft {
        QuestionDraft {
            question_text: Some(text.to_string()),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            ..QuestionDraft::default()
        }
    }

    #[test]
    fn blank_choices_are_dropped() {
        let raw = vec![
            " Red ".to_string(),
            "".to_string(),
            "   ".to_string(),
            "Blue".to_string(),
        ];
        assert_eq!(clean_choices(&raw), vec!["Red", "Blue"]);
    }

    #[test]
    fn results_without_votes_are_zero_percent() {
        let choices = vec![Choice {
            id: 1,
            question_id: 1,
            choice_text: "Yes".to_string(),
            votes: 0,
        }];
        let results = results(&choices);
        assert_eq!(results.total_votes, 0);
        assert_eq!(results.choices[0].percentage, 0.0);
    }

    #[tokio::test]
    async fn question_keeps_only_filled_choices() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let question = create_question(&state, draft("Best season?", &["Winter", " ", "", "Summer"]))
            .await
            .unwrap();

        let texts: Vec<String> = state
            .store
            .choices_for(question.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.choice_text)
            .collect();
        assert_eq!(texts, vec!["Winter", "Summer"]);
    }

    #[tokio::test]
    async fn duplicate_and_missing_question_text() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        create_question(&state, draft("Best season?", &["Winter"])).await.unwrap();

        let dup = create_question(&state, draft("Best season?", &["Summer"])).await;
        let missing = create_question(&state, QuestionDraft::default()).await;
        let long = create_question(&state, draft(&"x".repeat(201), &[])).await;
        let long_choice = create_question(&state, draft("Longest word?", &["ok", "y".repeat(201).as_str()])).await;

        assert!(matches!(dup, Err(PollError::DuplicateQuestion)));
        assert!(matches!(missing, Err(PollError::MissingText)));
        assert!(matches!(long, Err(PollError::TextTooLong)));
        assert!(matches!(long_choice, Err(PollError::ChoiceTooLong)));
        assert!(!state.store.question_text_exists("Longest word?").await.unwrap());
        create_question(&state, draft("Longest word?", &["y".repeat(200).as_str()])).await.unwrap();
    }

    #[tokio::test]
    async fn vote_once_per_question() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let anna = user(&state, "anna").await;
        let question = create_question(&state, draft("Best season?", &["Winter", "Summer"]))
            .await
            .unwrap();
        let choices = state.store.choices_for(question.id).await.unwrap();
        let winter = choices[0].id.to_string();

        cast_vote(&state, Some(&anna), &question, Some(&winter)).await.unwrap();
        let again = cast_vote(&state, Some(&anna), &question, Some(&winter)).await;

        assert!(matches!(again, Err(VoteError::AlreadyVoted)));
        assert_eq!(again.unwrap_err().to_string(), "Вы уже голосовали в этом опросе");
        let choices = state.store.choices_for(question.id).await.unwrap();
        assert_eq!(choices[0].votes, 1);
    }

    #[tokio::test]
    async fn rejected_votes_change_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let anna = user(&state, "anna").await;
        let question = create_question(&state, draft("Best season?", &["Winter"]))
            .await
            .unwrap();
        let winter = state.store.choices_for(question.id).await.unwrap()[0].id.to_string();

        let anonymous = cast_vote(&state, None, &question, Some(&winter)).await;
        let empty = cast_vote(&state, Some(&anna), &question, None).await;
        let garbage = cast_vote(&state, Some(&anna), &question, Some("abc")).await;
        let unknown = cast_vote(&state, Some(&anna), &question, Some("9999")).await;

        assert!(matches!(anonymous, Err(VoteError::Anonymous)));
        assert!(matches!(empty, Err(VoteError::NoChoice)));
        assert!(matches!(garbage, Err(VoteError::NoChoice)));
        assert!(matches!(unknown, Err(VoteError::NoChoice)));
        assert!(!state.store.has_voted(anna.id, question.id).await.unwrap());
        assert_eq!(state.store.choices_for(question.id).await.unwrap()[0].votes, 0);
    }
}
