//! Upload validation module
//!
//! Cheap checks on an upload before any decoding happens: the file name,
//! the format sniffed from the first bytes, and the size. The pipeline
//! still decodes the bytes, so a truncated or forged image only gets as far
//! as a 422.

use imgdedup_core::HashExtractor;

use crate::error::ApiError;

/// Accepted file extensions, lowercase
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Accepted MIME types, matched against the sniffed format
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Default max file size in bytes (16 MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 16 * 1024 * 1024;

/// Validates the filename of an uploaded file
///
/// The name must be non-empty and carry one of [`ALLOWED_EXTENSIONS`]
/// (case-insensitive).
pub fn validate_file_name(file_name: Option<&str>) -> Result<(), ApiError> {
    let name = match file_name.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ApiError::bad_request("Empty filename")),
    };

    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid file extension"))
    }
}

/// Validates the uploaded bytes by their leading magic bytes
///
/// The declared Content-Type is not trusted; the format sniffed from the
/// content must map to one of [`ALLOWED_MIME_TYPES`].
pub fn validate_file_content(data: &[u8]) -> Result<(), ApiError> {
    match HashExtractor::sniff_mime(data) {
        Some(mime) if ALLOWED_MIME_TYPES.contains(&mime) => Ok(()),
        Some(mime) => Err(ApiError::bad_request(format!("Invalid file type: {}", mime))),
        None => Err(ApiError::bad_request("Invalid file type: unrecognised")),
    }
}

/// Validates the size of an uploaded file
///
/// Returns a 413 error if the file exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        Err(ApiError::payload_too_large(format!(
            "File too large (max {}MB)",
            max_size / (1024 * 1024)
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_name_allowed() {
        assert!(validate_file_name(Some("cat.png")).is_ok());
        assert!(validate_file_name(Some("cat.JPG")).is_ok());
        assert!(validate_file_name(Some("archive.tar.jpeg")).is_ok());
        assert!(validate_file_name(Some("anim.gif")).is_ok());
        assert!(validate_file_name(Some("photo.webp")).is_ok());
    }

    #[test]
    fn test_validate_file_name_rejected() {
        assert!(validate_file_name(None).is_err());
        assert!(validate_file_name(Some("")).is_err());
        assert!(validate_file_name(Some("README")).is_err());
        assert!(validate_file_name(Some("image.bmp")).is_err());
        assert!(validate_file_name(Some("shell.php")).is_err());
    }

    #[test]
    fn test_validate_file_content_accepts_image_magic() {
        // PNG signature followed by garbage: decoding is the pipeline's job
        let mut png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(b"not really");
        assert!(validate_file_content(&png).is_ok());
        assert!(validate_file_content(&[0xFF, 0xD8, 0xFF, 0xE0]).is_ok());
        assert!(validate_file_content(b"GIF89a").is_ok());
    }

    #[test]
    fn test_validate_file_content_rejected() {
        let err = validate_file_content(b"<!DOCTYPE html><html></html>").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(validate_file_content(&[]).is_err());
        // BMP is recognised but not accepted
        let err = validate_file_content(b"BM\x00\x00\x00\x00\x00\x00").unwrap_err();
        assert_eq!(err.to_string(), "Bad request: Invalid file type: image/bmp");
    }

    #[test]
    fn test_validate_file_size_ok() {
        let max = 10 * 1024 * 1024; // 10 MB
        assert!(validate_file_size(1024, max).is_ok()); // 1 KB
        assert!(validate_file_size(max, max).is_ok()); // exactly max
    }

    #[test]
    fn test_validate_file_size_too_large() {
        let max = 10 * 1024 * 1024; // 10 MB
        let err = validate_file_size(max + 1, max).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    }
}
