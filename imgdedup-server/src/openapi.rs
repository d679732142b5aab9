//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/openapi.json`.

use axum::Json;
use utoipa::OpenApi;

use crate::handlers::{DuplicateMatch, DuplicateResponse, HealthResponse, ReadyResponse, UploadResponse};

/// imgdedup API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "imgdedup API",
        version = "0.1.0",
        description = r#"
## Perceptual Duplicate Detection

Upload an image and learn whether a near-duplicate is already stored.

Each image is fingerprinted with three 64-bit perceptual hashes
(pHash, aHash, dHash) and a SHA3-256 content digest. Similarity is the
mean per-hash Hamming similarity, from 0 to 100.

### How It Works

1. `POST /upload` with the image in the `file` field
2. Byte-identical and exact-hash matches are found by indexed lookups
3. Otherwise the newest stored images are scored against the threshold
4. With no match the image is stored (201), else the matches are returned (200)
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Detection", description = "Submit images for duplicate detection"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::upload::upload_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            UploadResponse,
            DuplicateResponse,
            DuplicateMatch,
        )
    )
)]
pub struct ApiDoc;

/// GET /openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
