// src/accounts.rs
use thiserror::Error;
use tracing::info;

use crate::{
    auth::{hash_password, verify_password, HashError},
    media::{MediaError, MediaKind, Upload},
    models::{NewUser, User, MAX_EMAIL_LEN, MAX_USERNAME_LEN},
    state::State,
    store::{StoreError, UniqueField},
};

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Заполните все обязательные поля")]
    MissingFields,

    #[error("Пароли не совпадают")]
    PasswordMismatch,

    #[error("Пользователь с таким именем уже существует")]
    UsernameTaken,

    #[error("Пользователь с таким email уже существует")]
    EmailTaken,

    #[error("Имя пользователя не длиннее 150 символов")]
    UsernameTooLong,

    #[error("Email не длиннее 254 символов")]
    EmailTooLong,

    #[error("Загрузите аватар")]
    AvatarRequired,

    #[error("Неверное имя пользователя или пароль")]
    InvalidCredentials,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(UniqueField::Username) => AccountError::UsernameTaken,
            StoreError::Conflict(UniqueField::Email) => AccountError::EmailTaken,
            other => AccountError::Store(other),
        }
    }
}

impl AccountError {
    pub fn is_user_facing(&self) -> bool {
        match self {
            AccountError::Store(_) | AccountError::Hash(_) => false,
            AccountError::Media(err) => err.is_user_facing(),
            _ => true,
        }
    }
}

fn check_username(username: &str) -> Result<(), AccountError> {
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AccountError::UsernameTooLong);
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), AccountError> {
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(AccountError::EmailTooLong);
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
    pub avatar: Option<Upload>,
}

pub async fn register(state: &State, form: Registration) -> Result<User, AccountError> {
    let (Some(username), Some(email), Some(password1)) = (form.username, form.email, form.password1)
    else {
        return Err(AccountError::MissingFields);
    };
    if password1.is_empty() {
        return Err(AccountError::MissingFields);
    }
    check_username(&username)?;
    check_email(&email)?;
    if form.password2.as_deref() != Some(password1.as_str()) {
        return Err(AccountError::PasswordMismatch);
    }
    if state.store.username_taken(&username, None).await? {
        return Err(AccountError::UsernameTaken);
    }
    if state.store.email_taken(&email, None).await? {
        return Err(AccountError::EmailTaken);
    }
    let upload = form.avatar.ok_or(AccountError::AvatarRequired)?;

    let password_hash = hash_password(&password1)?;
    let avatar = state.media.save(MediaKind::Avatar, &upload).await?;

    let new = NewUser {
        username,
        email,
        password_hash,
        avatar: avatar.clone(),
    };
    match state.store.create_user(new).await {
        Ok(user) => {
            info!(user = user.id, username = %user.username, "Account created");
            Ok(user)
        }
        Err(err) => {
            state.media.remove(&avatar).await;
            Err(err.into())
        }
    }
}

pub async fn authenticate(state: &State, username: &str, password: &str) -> Result<User, AccountError> {
    let user = state
        .store
        .find_user_by_username(username)
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    if verify_password(password, &user.password_hash) {
        Ok(user)
    } else {
        Err(AccountError::InvalidCredentials)
    }
}

#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<Upload>,
}

/// Applies the non-empty, changed fields to `user`.
pub async fn update_profile(state: &State, user: &User, changes: ProfileChanges) -> Result<User, AccountError> {
    let mut updated = user.clone();

    if let Some(username) = changes.username.filter(|name| *name != user.username) {
        check_username(&username)?;
        if state.store.username_taken(&username, Some(user.id)).await? {
            return Err(AccountError::UsernameTaken);
        }
        updated.username = username;
    }

    if let Some(email) = changes.email.filter(|email| *email != user.email) {
        check_email(&email)?;
        if state.store.email_taken(&email, Some(user.id)).await? {
            return Err(AccountError::EmailTaken);
        }
        updated.email = email;
    }

    let new_avatar = match &changes.avatar {
        Some(upload) => Some(state.media.save(MediaKind::Avatar, upload).await?),
        None => None,
    };
    if let Some(avatar) = &new_avatar {
        updated.avatar = avatar.clone();
    }

    match state.store.update_user(&updated).await {
        Ok(saved) => {
            if new_avatar.is_some() {
                state.media.remove(&user.avatar).await;
            }
            info!(user = saved.id, "Profile updated");
            Ok(saved)
        }
        Err(err) => {
            if let Some(avatar) = new_avatar {
                state.media.remove(&avatar).await;
            }
            Err(err.into())
        }
    }
}

pub async fn delete_account(state: &State, user: &User) -> Result<(), AccountError> {
    state.store.delete_user(user.id).await?;
    state.media.remove(&user.avatar).await;
    info!(user = user.id, "Account deleted");
    Ok(())
}
