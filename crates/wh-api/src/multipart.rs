//! Collects a `multipart/form-data` body into text fields and file bytes.

use std::collections::HashMap;

use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use wh_core::error::AppError;

#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// The uploaded bytes; an empty file input counts as no upload.
    pub fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name).filter(|data| !data.is_empty())
    }
}

fn malformed(err: impl std::fmt::Display) -> AppError {
    log::debug!("rejected multipart body: {err}");
    AppError::invalid("form", "The submitted form could not be read.")
}

/// Text fields are read up to this many bytes. Anything longer is far past
/// every field's character limit, so validation still reports it on the field.
pub const TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Cuts an over-long text field on the last whole character.
fn text_field(mut data: Vec<u8>, truncated: bool) -> Result<String, AppError> {
    if truncated {
        if let Err(err) = std::str::from_utf8(&data) {
            if err.error_len().is_none() {
                data.truncate(err.valid_up_to());
            }
        }
    }
    String::from_utf8(data).map_err(malformed)
}

/// Files are kept up to `max_file_bytes + 1` bytes so that oversized uploads
/// still fail the size check without being buffered whole.
pub async fn read(mut payload: Multipart, max_file_bytes: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let is_file = disposition.get_filename().is_some();
        let cap = if is_file { max_file_bytes + 1 } else { TEXT_FIELD_BYTES };

        let mut data = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            let room = cap.saturating_sub(data.len());
            truncated |= chunk.len() > room;
            data.extend_from_slice(&chunk[..chunk.len().min(room)]);
        }

        if is_file {
            form.files.insert(name, data);
        } else {
            form.fields.insert(name, text_field(data, truncated)?);
        }
    }
    Ok(form)
}
