// src/media.rs
//! Uploaded images and the multipart forms that carry them.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart},
};
use http::StatusCode;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Файл должен быть изображением")]
    NotAnImage,

    #[error("Файл слишком большой")]
    TooLarge,

    #[error("Некорректные данные формы")]
    Malformed(#[source] MultipartError),

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MultipartError> for MediaError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            MediaError::TooLarge
        } else {
            MediaError::Malformed(err)
        }
    }
}

impl MediaError {
    /// Whether the form should be shown again with this message.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, MediaError::NotAnImage | MediaError::TooLarge)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MediaKind {
    Avatar,
    QuestionImage,
}

impl MediaKind {
    fn dir(self) -> &'static str {
        match self {
            MediaKind::Avatar => "avatars",
            MediaKind::QuestionImage => "questions",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl Upload {
    fn image_extension(&self) -> Option<String> {
        let ext = Path::new(&self.file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }
}

/// Text fields and files of a submitted multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Upload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, MediaError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    // browsers send an empty part for an untouched file input
                    if !file_name.is_empty() && !bytes.is_empty() {
                        form.files.insert(name, Upload { file_name, bytes });
                    }
                }
                None => {
                    let text = field.text().await?;
                    form.fields.entry(name).or_default().push(text);
                }
            }
        }
        Ok(form)
    }

    /// First value of a field, trimmed, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Raw value of a field, untouched. Passwords go through here.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(|values| values.first()).cloned()
    }

    pub fn all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}

/// Directory holding uploaded files, served under `/media`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the upload under a fresh name and returns its path relative to the root.
    pub async fn save(&self, kind: MediaKind, upload: &Upload) -> Result<String, MediaError> {
        let ext = upload.image_extension().ok_or(MediaError::NotAnImage)?;
        let relative = format!("{}/{}.{}", kind.dir(), Uuid::new_v4().simple(), ext);

        tokio::fs::create_dir_all(self.root.join(kind.dir())).await?;
        tokio::fs::write(self.root.join(&relative), &upload.bytes).await?;
        Ok(relative)
    }

    /// Best effort: a missing file is not an error.
    pub async fn remove(&self, relative: &str) {
        if relative.is_empty() || relative.contains("..") {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove media file {relative}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> Upload {
        Upload {
            file_name: name.to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[test]
    fn only_image_extensions_are_accepted() {
        assert_eq!(upload("me.PNG").image_extension().as_deref(), Some("png"));
        assert_eq!(upload("photo.jpeg").image_extension().as_deref(), Some("jpeg"));
        assert!(upload("notes.txt").image_extension().is_none());
        assert!(upload("noext").image_extension().is_none());
    }

    #[tokio::test]
    async fn save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());

        let relative = media.save(MediaKind::Avatar, &upload("me.png")).await.unwrap();
        assert!(relative.starts_with("avatars/"));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).exists());

        media.remove(&relative).await;
        assert!(!dir.path().join(&relative).exists());
    }

    #[tokio::test]
    async fn text_files_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());

        let err = media.save(MediaKind::QuestionImage, &upload("x.txt")).await.unwrap_err();
        assert!(matches!(err, MediaError::NotAnImage));
    }
}
