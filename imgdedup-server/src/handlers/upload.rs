//! Upload handler
//!
//! Handles POST /upload: validates the multipart file, runs it through the
//! admission pipeline and reports whether it was stored or matched.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use imgdedup_core::{CandidateMatch, MatchKind, SubmissionOutcome};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Response for an admitted image
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Always "success"
    #[schema(example = "success")]
    pub status: &'static str,
    /// Identifier of the new fingerprint record
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    /// Stored location relative to the upload root
    #[schema(example = "3f/a1/3fa1c0de...e9.png")]
    pub path: String,
    /// Server-side processing time in seconds
    #[schema(example = 0.042)]
    pub processing_time: f64,
}

/// One stored image similar to the upload
#[derive(Debug, Serialize, ToSchema)]
pub struct DuplicateMatch {
    /// Record identifier
    pub id: Uuid,
    /// Stored location relative to the upload root
    #[schema(example = "3f/a1/3fa1c0de...e9.png")]
    pub path: String,
    /// Similarity in percent, two decimals
    #[schema(example = 96.88)]
    pub similarity: f64,
    /// How the match was found: content_digest, exact_phash, exact_ahash, exact_dhash or scored
    #[schema(example = "scored")]
    pub match_type: String,
    /// When the matched image was admitted
    pub created_at: DateTime<Utc>,
}

impl From<CandidateMatch> for DuplicateMatch {
    fn from(m: CandidateMatch) -> Self {
        Self {
            id: m.record.id,
            path: m.record.storage_path,
            similarity: m.similarity,
            match_type: match_type(m.kind),
            created_at: m.record.created_at,
        }
    }
}

/// Response for an upload that matched stored images
#[derive(Debug, Serialize, ToSchema)]
pub struct DuplicateResponse {
    /// Always "duplicate"
    #[schema(example = "duplicate")]
    pub status: &'static str,
    /// Best matches first, at most the presentation limit
    pub matches: Vec<DuplicateMatch>,
    /// Number of qualifying matches before truncation
    #[schema(example = 3)]
    pub total: usize,
    /// Human-readable summary
    #[schema(example = "Found 3 similar image(s)")]
    pub message: String,
}

fn match_type(kind: MatchKind) -> String {
    match kind {
        MatchKind::ContentDigest => "content_digest".to_string(),
        MatchKind::ExactHash(hash) => format!("exact_{}", hash.as_str()),
        MatchKind::Scored => "scored".to_string(),
    }
}

/// Submit an image for duplicate detection
///
/// Accepts multipart/form-data with:
/// - **file** (required): PNG, JPEG, WebP or GIF image (max 16MB by default)
///
/// If a stored image is similar enough, nothing is stored and the matches
/// are returned with 200. Otherwise the image is stored and 201 is returned.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Detection",
    request_body(
        content_type = "multipart/form-data",
        description = "Image file in the `file` field"
    ),
    responses(
        (status = 201, description = "Image admitted and stored", body = UploadResponse),
        (status = 200, description = "Similar image(s) already stored", body = DuplicateResponse),
        (status = 400, description = "Missing file, bad extension or MIME type, unreadable upload"),
        (status = 413, description = "File too large"),
        (status = 422, description = "File is not a decodable image"),
        (status = 500, description = "Storage failure"),
        (status = 503, description = "Fingerprint repository unavailable")
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let file = MultipartFields::parse(&mut multipart, state.max_file_size)
        .await?
        .into_file()?;

    tracing::debug!(
        file_name = ?file.file_name,
        content_type = ?file.content_type,
        bytes = file.data.len(),
        "Upload received"
    );

    match state.pipeline.submit(file.data).await? {
        SubmissionOutcome::Admitted {
            record,
            path,
            elapsed,
        } => {
            let body = UploadResponse {
                status: "success",
                id: record.id,
                path,
                processing_time: elapsed.as_secs_f64(),
            };
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        SubmissionOutcome::Duplicate { matches, total } => {
            let body = DuplicateResponse {
                status: "duplicate",
                message: format!("Found {} similar image(s)", total),
                matches: matches.into_iter().map(DuplicateMatch::from).collect(),
                total,
            };
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        SubmissionOutcome::Rejected { reason } => Err(ApiError::rejected(&reason)),
    }
}
