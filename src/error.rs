// src/error.rs
use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;
use tracing::error;

use crate::{accounts::AccountError, media::MediaError, poll::PollError, store::StoreError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Страница не найдена")]
    NotFound,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Poll error: {0}")]
    Poll(#[from] PollError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Media(MediaError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Media(MediaError::Malformed(_) | MediaError::NotAnImage) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status.is_server_error() {
            error!("{self}");
            "Внутренняя ошибка сервера".to_string()
        } else {
            self.to_string()
        };

        let body = format!(
            "<!DOCTYPE html><html lang=\"ru\"><head><meta charset=\"utf-8\"><title>{code}</title></head>\
             <body><h1>{code}</h1><p>{message}</p><p><a href=\"/\">На главную</a></p></body></html>",
            code = status.as_u16(),
            message = message,
        );
        (status, Html(body)).into_response()
    }
}
