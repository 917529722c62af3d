// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Multipart parsing and request-scoped staging files.
//!
//! Every file part is written to the upload directory and owned by a
//! [`TempUpload`]. Dropping the guard deletes the file, so staging files are
//! removed on every exit path of a request.

use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// A staged upload that is deleted when dropped.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    original_name: String,
}

impl TempUpload {
    /// Take ownership of an existing staging file.
    pub fn new(path: PathBuf, original_name: impl Into<String>) -> Self {
        Self {
            path,
            original_name: original_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name as sent by the client.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Deleted staging file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to delete staging file"
            ),
        }
    }
}

/// Text fields and staged files from a multipart body.
///
/// Only the first file per field name is kept; extra parts are discarded.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempUpload>,
}

impl MultipartForm {
    /// Remove and return a text field.
    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Remove and return a staged file.
    pub fn take_file(&mut self, name: &str) -> Option<TempUpload> {
        self.files.remove(name)
    }
}

/// Read a multipart body, staging file parts under `upload_dir`.
///
/// Staged files are named with a random UUID; only the client's extension
/// is kept so the client name never influences the path.
pub async fn read_multipart(mut multipart: Multipart, upload_dir: &Path) -> Result<MultipartForm> {
    let mut form = MultipartForm::default();

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Cannot create upload dir: {}", e)))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(original_name) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;

                if bytes.is_empty() || form.files.contains_key(&name) {
                    continue;
                }

                let staged_name = match Path::new(&original_name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                {
                    Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext),
                    None => uuid::Uuid::new_v4().to_string(),
                };
                let path = upload_dir.join(staged_name);

                // Guard first, so a failed write still cleans up a partial file.
                let upload = TempUpload::new(path, original_name);
                tokio::fs::write(upload.path(), &bytes).await.map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Cannot stage upload: {}", e))
                })?;

                tracing::debug!(
                    field = %name,
                    path = %upload.path().display(),
                    size = bytes.len(),
                    "Staged upload"
                );
                form.files.insert(name, upload);
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                form.fields.insert(name, text);
            }
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_deletes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged.png");
        std::fs::write(&path, b"img").unwrap();

        let upload = TempUpload::new(path.clone(), "avatar.png");
        assert!(path.exists());
        drop(upload);
        assert!(!path.exists());
    }

    #[test]
    fn test_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload::new(dir.path().join("never-written"), "x");
        drop(upload);
    }
}
