//! Multipart form parsing helpers
//!
//! Reads the `file` part of a multipart/form-data upload, validating its
//! name before the body is buffered, its size while it streams and its
//! sniffed format once it is complete.

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::{validate_file_content, validate_file_name, validate_file_size};

/// Name of the multipart part carrying the image
pub const FILE_FIELD: &str = "file";

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type declared by the client (if provided), for logging only
    pub content_type: Option<String>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

/// Parsed multipart form fields
#[derive(Debug, Default)]
pub struct MultipartFields {
    file: Option<FileField>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request
    ///
    /// Parts other than `file` are drained and ignored. The first `file`
    /// part wins.
    ///
    /// # Example
    /// ```ignore
    /// let fields = MultipartFields::parse(&mut multipart, DEFAULT_MAX_FILE_SIZE).await?;
    /// let file = fields.into_file()?;
    /// ```
    pub async fn parse(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut file: Option<FileField> = None;

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            if field.name() != Some(FILE_FIELD) || file.is_some() {
                continue;
            }

            let content_type = field.content_type().map(|s| s.to_string());
            let file_name = field.file_name().map(|s| s.to_string());

            validate_file_name(file_name.as_deref())?;

            // Stop reading as soon as the limit is crossed
            let mut data = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
            {
                validate_file_size(data.len() + chunk.len(), max_file_size)?;
                data.extend_from_slice(&chunk);
            }
            validate_file_content(&data)?;

            file = Some(FileField {
                data,
                content_type,
                file_name,
            });
        }

        Ok(Self { file })
    }

    /// Take the file field (required)
    ///
    /// Returns an error if no file was uploaded.
    pub fn into_file(self) -> Result<FileField, ApiError> {
        self.file
            .ok_or_else(|| ApiError::bad_request("No file uploaded. Use 'file' field in multipart form."))
    }
}
