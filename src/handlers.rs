// src/handlers.rs
use axum::{
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    accounts::{self, ProfileChanges, Registration},
    auth::{self, CurrentUser},
    error::AppError,
    media::FormData,
    models::{Question, User},
    poll::{self, QuestionDraft, VoteError},
    state::SharedState,
    templates::{
        render, CreateTemplate, DetailTemplate, EditProfileTemplate, IndexTemplate, LoginTemplate,
        ProfileTemplate, QuestionRow, RegisterTemplate, ResultsTemplate,
    },
};

fn display_date(date: DateTime<Utc>) -> String {
    date.format("%d.%m.%Y %H:%M").to_string()
}

async fn find_question(state: &SharedState, id: i32) -> Result<Question, AppError> {
    state.store.get_question(id).await?.ok_or(AppError::NotFound)
}

/// All questions, newest first.
pub async fn index(State(state): State<SharedState>, current: CurrentUser) -> Result<Html<String>, AppError> {
    let now = Utc::now();
    let latest_question_list = state
        .store
        .list_questions()
        .await?
        .into_iter()
        .map(|question| QuestionRow {
            recent: question.was_published_recently(now),
            expired: question.is_expired(now),
            pub_date: display_date(question.pub_date),
            id: question.id,
            question_text: question.question_text,
        })
        .collect();

    render(&IndexTemplate {
        username: current.username(),
        latest_question_list,
    })
}

async fn detail_page(
    state: &SharedState,
    current: &CurrentUser,
    question: Question,
    has_voted: bool,
    error_message: Option<String>,
) -> Result<Html<String>, AppError> {
    let choices = state.store.choices_for(question.id).await?;
    render(&DetailTemplate {
        username: current.username(),
        expired: question.is_expired(Utc::now()),
        question,
        choices,
        has_voted,
        error_message,
    })
}

pub async fn detail(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(question_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let question = find_question(&state, question_id).await?;
    let has_voted = match &current.0 {
        Some(user) => state.store.has_voted(user.id, question.id).await?,
        None => false,
    };
    detail_page(&state, &current, question, has_voted, None).await
}

pub async fn results(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(question_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let question = find_question(&state, question_id).await?;
    let choices = state.store.choices_for(question.id).await?;

    render(&ResultsTemplate {
        username: current.username(),
        results: poll::results(&choices),
        question,
    })
}

#[derive(Deserialize)]
pub struct VoteForm {
    choice: Option<String>,
}

pub async fn vote(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(question_id): Path<i32>,
    Form(form): Form<VoteForm>,
) -> Result<Response, AppError> {
    let question = find_question(&state, question_id).await?;

    match poll::cast_vote(&state, current.0.as_ref(), &question, form.choice.as_deref()).await {
        Ok(()) => Ok(Redirect::to(&format!("/questions/{}/results", question.id)).into_response()),
        Err(VoteError::Store(err)) => Err(err.into()),
        Err(err) => {
            let has_voted = matches!(err, VoteError::AlreadyVoted);
            let page = detail_page(&state, &current, question, has_voted, Some(err.to_string())).await?;
            Ok(page.into_response())
        }
    }
}

fn register_page(error: Option<String>) -> Result<Response, AppError> {
    let page = render(&RegisterTemplate {
        username: None,
        error,
    })?;
    Ok(page.into_response())
}

pub async fn register_form(current: CurrentUser) -> Result<Html<String>, AppError> {
    render(&RegisterTemplate {
        username: current.username(),
        error: None,
    })
}

pub async fn register(
    State(state): State<SharedState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = match FormData::read(multipart).await {
        Ok(form) => form,
        Err(err) if err.is_user_facing() => return register_page(Some(err.to_string())),
        Err(err) => return Err(err.into()),
    };
    let registration = Registration {
        username: form.text("username"),
        email: form.text("email"),
        password1: form.raw("password1"),
        password2: form.raw("password2"),
        avatar: form.take_file("avatar"),
    };

    match accounts::register(&state, registration).await {
        Ok(user) => {
            let jar = auth::login(&state, jar, &user).await?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(err) if err.is_user_facing() => register_page(Some(err.to_string())),
        Err(err) => Err(err.into()),
    }
}

pub async fn login_form(current: CurrentUser) -> Result<Html<String>, AppError> {
    render(&LoginTemplate {
        username: current.username(),
        error: None,
    })
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match accounts::authenticate(&state, form.username.trim(), &form.password).await {
        Ok(user) => {
            let jar = auth::login(&state, jar, &user).await?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(err) if err.is_user_facing() => {
            let page = render(&LoginTemplate {
                username: None,
                error: Some(err.to_string()),
            })?;
            Ok(page.into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(State(state): State<SharedState>, jar: CookieJar) -> Result<Response, AppError> {
    let jar = auth::logout(&state, jar).await?;
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn profile(current: CurrentUser) -> Result<Response, AppError> {
    let Some(user) = current.0 else {
        return Ok(Redirect::to("/login").into_response());
    };

    let page = render(&ProfileTemplate {
        username: Some(user.username.clone()),
        date_joined: display_date(user.date_joined),
        user,
    })?;
    Ok(page.into_response())
}

#[derive(Deserialize)]
pub struct ProfileAction {
    delete_account: Option<String>,
    edit_account: Option<String>,
}

pub async fn profile_action(
    State(state): State<SharedState>,
    current: CurrentUser,
    jar: CookieJar,
    Form(action): Form<ProfileAction>,
) -> Result<Response, AppError> {
    let Some(user) = current.0 else {
        return Ok(Redirect::to("/login").into_response());
    };

    if action.delete_account.is_some() {
        accounts::delete_account(&state, &user).await?;
        let jar = auth::logout(&state, jar).await?;
        return Ok((jar, Redirect::to("/")).into_response());
    }
    if action.edit_account.is_some() {
        return Ok(Redirect::to("/profile/edit").into_response());
    }
    Ok(Redirect::to("/profile").into_response())
}

fn edit_profile_page(user: User, error: Option<String>) -> Result<Response, AppError> {
    let page = render(&EditProfileTemplate {
        username: Some(user.username.clone()),
        user,
        error,
    })?;
    Ok(page.into_response())
}

pub async fn edit_profile_form(current: CurrentUser) -> Result<Response, AppError> {
    let Some(user) = current.0 else {
        return Ok(Redirect::to("/login").into_response());
    };
    edit_profile_page(user, None)
}

pub async fn edit_profile(
    State(state): State<SharedState>,
    current: CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let Some(user) = current.0 else {
        return Ok(Redirect::to("/login").into_response());
    };

    let mut form = match FormData::read(multipart).await {
        Ok(form) => form,
        Err(err) if err.is_user_facing() => return edit_profile_page(user, Some(err.to_string())),
        Err(err) => return Err(err.into()),
    };
    let changes = ProfileChanges {
        username: form.text("username"),
        email: form.text("email"),
        avatar: form.take_file("avatar"),
    };

    match accounts::update_profile(&state, &user, changes).await {
        Ok(_) => Ok(Redirect::to("/profile").into_response()),
        Err(err) if err.is_user_facing() => edit_profile_page(user, Some(err.to_string())),
        Err(err) => Err(err.into()),
    }
}

fn create_page(current: &CurrentUser, error: Option<String>) -> Result<Response, AppError> {
    let page = render(&CreateTemplate {
        username: current.username(),
        error,
    })?;
    Ok(page.into_response())
}

pub async fn create_form(current: CurrentUser) -> Result<Response, AppError> {
    create_page(&current, None)
}

pub async fn create(
    State(state): State<SharedState>,
    current: CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = match FormData::read(multipart).await {
        Ok(form) => form,
        Err(err) if err.is_user_facing() => return create_page(&current, Some(err.to_string())),
        Err(err) => return Err(err.into()),
    };
    let draft = QuestionDraft {
        question_text: form.text("question_text"),
        question_description: form.text("question_description"),
        question_image: form.take_file("question_image"),
        choices: form.all("choices").to_vec(),
    };

    match poll::create_question(&state, draft).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(err) if err.is_user_facing() => create_page(&current, Some(err.to_string())),
        Err(err) => Err(err.into()),
    }
}
