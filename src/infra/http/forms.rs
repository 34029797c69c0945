use axum::{extract::Multipart, http::StatusCode};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::error::HttpError;

/// Decoded multipart payload of the post create/edit form.
#[derive(Debug, Default)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<Uuid>,
    /// Original filename and bytes of the uploaded image, if the form
    /// submitted one.
    pub image: Option<(String, Bytes)>,
}

/// Urlencoded comment form.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

/// Read the post form out of a multipart body. Unknown fields are ignored
/// so the form can grow without breaking older clients.
pub async fn parse_post_form(mut multipart: Multipart) -> Result<PostForm, HttpError> {
    const SOURCE: &str = "infra::http::forms::parse_post_form";

    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Malformed form submission",
            err.to_string(),
        )
    })? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "text" => {
                form.text = field.text().await.map_err(|err| {
                    HttpError::new(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        err.to_string(),
                    )
                })?;
            }
            "group" => {
                let raw = field.text().await.map_err(|err| {
                    HttpError::new(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        err.to_string(),
                    )
                })?;
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    let id = trimmed.parse::<Uuid>().map_err(|err| {
                        HttpError::new(
                            SOURCE,
                            StatusCode::BAD_REQUEST,
                            "Invalid group selection",
                            err.to_string(),
                        )
                    })?;
                    form.group_id = Some(id);
                }
            }
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let data = field.bytes().await.map_err(|err| {
                    HttpError::new(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        err.to_string(),
                    )
                })?;
                // Browsers submit an empty part when no file was chosen.
                if !data.is_empty() {
                    form.image = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}
