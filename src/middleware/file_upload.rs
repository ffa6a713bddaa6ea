use actix_multipart::{Multipart, MultipartError};
use actix_web::{dev::Payload, http::header, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use futures::TryStreamExt;

use crate::utils::AppError;

const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Limites do upload, registrados via `app_data` (como `JsonConfig`)
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub field_name: &'static str,
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            field_name: "file",
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Arquivo JSON enviado como multipart, mantido inteiro em memória.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl FromRequest for UploadedFile {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let config = req.app_data::<UploadConfig>().cloned().unwrap_or_default();

        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

        if !is_multipart {
            return Box::pin(async { Err(no_file()) });
        }

        let multipart = Multipart::new(req.headers(), payload.take());
        Box::pin(read_file(multipart, config))
    }
}

async fn read_file(mut multipart: Multipart, config: UploadConfig) -> Result<UploadedFile, AppError> {
    while let Some(mut field) = multipart.try_next().await.map_err(invalid_body)? {
        if field.name() != Some(config.field_name) {
            // Descarta campos que não interessam
            while field.try_next().await.map_err(invalid_body)?.is_some() {}
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(String::from);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        if !is_json(filename.as_deref(), content_type.as_deref()) {
            return Err(AppError::validation("Only JSON files are allowed"));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(invalid_body)? {
            if bytes.len() + chunk.len() > config.max_bytes {
                return Err(AppError::validation(format!(
                    "File exceeds the maximum size of {} bytes",
                    config.max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        log::debug!("📎 Received upload {:?} ({} bytes)", filename, bytes.len());
        return Ok(UploadedFile { filename, bytes });
    }

    Err(no_file())
}

fn is_json(filename: Option<&str>, content_type: Option<&str>) -> bool {
    content_type == Some("application/json")
        || filename.is_some_and(|name| name.to_ascii_lowercase().ends_with(".json"))
}

fn no_file() -> AppError {
    AppError::validation("Please upload a JSON file")
}

fn invalid_body(err: MultipartError) -> AppError {
    AppError::validation(format!("Invalid multipart body: {}", err))
}
