//! Multipart image uploads.

use std::collections::HashMap;

use axum::extract::Multipart;
use punch_common::{AppError, AppResult};

/// A parsed upload: the `file` part plus any text fields sent with it.
pub struct Upload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub fields: HashMap<String, String>,
}

impl Upload {
    /// Read every part of the form. Fails when no `file` part is present.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut file: Option<(Vec<u8>, String)> = None;
        let mut fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
                file = Some((data, content_type));
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                fields.insert(name, text);
            }
        }

        let (data, content_type) =
            file.ok_or_else(|| AppError::BadRequest("Missing file part".to_string()))?;

        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        Ok(Self {
            data,
            content_type,
            fields,
        })
    }

    /// A required text field.
    pub fn field(&self, name: &str) -> AppResult<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::BadRequest(format!("Missing field {name}")))
    }
}
