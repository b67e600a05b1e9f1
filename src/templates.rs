// src/templates.rs
//! Server-rendered pages. Every page extends `base.html`, which needs
//! `username` for the navigation bar.
use askama::Template;
use axum::response::Html;

use crate::{
    error::AppError,
    models::{Choice, Question, User},
    poll::PollResults,
};

pub fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

pub struct QuestionRow {
    pub id: i32,
    pub question_text: String,
    pub pub_date: String,
    pub recent: bool,
    pub expired: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub username: Option<String>,
    pub latest_question_list: Vec<QuestionRow>,
}

#[derive(Template)]
#[template(path = "detail.html")]
pub struct DetailTemplate {
    pub username: Option<String>,
    pub question: Question,
    pub choices: Vec<Choice>,
    pub has_voted: bool,
    pub expired: bool,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "results.html")]
pub struct ResultsTemplate {
    pub username: Option<String>,
    pub question: Question,
    pub results: PollResults,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub username: Option<String>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub username: Option<String>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub username: Option<String>,
    pub user: User,
    pub date_joined: String,
}

#[derive(Template)]
#[template(path = "edit_profile.html")]
pub struct EditProfileTemplate {
    pub username: Option<String>,
    pub user: User,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "create.html")]
pub struct CreateTemplate {
    pub username: Option<String>,
    pub error: Option<String>,
}
