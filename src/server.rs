//! HTTP API
//!
//! TigerStyle: thin handlers over `cms_core`. Visitor routes never fail for a
//! known section; admin routes require an admin session; storage routes are
//! the pre-signed upload target and the public object URL space.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use cms_core::constants::MEDIA_UPLOAD_BYTES_MAX;
use cms_core::dst::Clock;
use cms_core::editor::{load_json, save_json, EditorSnapshot};
use cms_core::for_section;
use cms_core::media::{content_type_for, object_name, stored_extension, SignedUpload, SweepReport};
use cms_core::renderer::render_json;
use cms_core::section::{LocationsContent, MapView, SectionKind, SectionSchema};
use cms_core::{
    CmsConfig, ContentClient, EditorError, MediaError, MediaKind, MediaStore, RenderSource,
    SaveOutcome, StoreError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{require_admin, AuthError, Profile, SessionVerifier};

// =============================================================================
// State
// =============================================================================

/// Shared state of every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Content and media stores
    pub client: ContentClient,
    /// Auth service
    pub verifier: Arc<dyn SessionVerifier>,
    /// Environment settings
    pub config: Arc<CmsConfig>,
}

impl AppState {
    async fn authorize(&self, headers: &HeaderMap) -> Result<Profile, ApiError> {
        Ok(require_admin(self.verifier.as_ref(), headers).await?)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Handler errors, mapped to status codes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Section identifier not known to the site
    #[error("unknown section {0}")]
    UnknownSection(String),

    /// Object not in the bucket
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Authentication or authorization failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Editing or saving failed
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Object storage failed
    #[error(transparent)]
    Media(#[from] MediaError),
}

impl ApiError {
    /// Status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownSection(_) | Self::ObjectNotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(AuthError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Editor(EditorError::Schema(_) | EditorError::IndexOutOfRange { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Editor(EditorError::Store(e)) => store_status(e),
            Self::Editor(EditorError::Media(e)) | Self::Media(e) => media_status(e),
        }
    }
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::Conflict { .. } | StoreError::NotFound { .. } => StatusCode::CONFLICT,
        StoreError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn media_status(e: &MediaError) -> StatusCode {
    match e {
        MediaError::TokenRejected { .. } => StatusCode::FORBIDDEN,
        MediaError::NotFound { .. } => StatusCode::NOT_FOUND,
        MediaError::InvalidName(_) => StatusCode::BAD_REQUEST,
        MediaError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        MediaError::ContentTypeMismatch { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        MediaError::Transcode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MediaError::Sign(_)
        | MediaError::Upload(_)
        | MediaError::Storage(_)
        | MediaError::Content(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_section(section: &str) -> Result<SectionKind, ApiError> {
    SectionKind::from_id(section).ok_or_else(|| ApiError::UnknownSection(section.to_string()))
}

// =============================================================================
// Bodies
// =============================================================================

/// Visitor view of one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionView {
    /// Section identifier
    pub section: String,
    /// Rendered document
    pub content: Value,
    /// Stored or defaults
    pub source: RenderSource,
}

/// `PUT /api/admin/sections/:section`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Whole document
    pub content: Value,
    /// Version the document was loaded at; absent for a first save
    #[serde(default)]
    pub base_version: Option<u64>,
}

/// `POST /api/admin/media/sign`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    /// Section the object belongs to
    pub section: String,
    /// Entry position (0 for section-level media)
    #[serde(default)]
    pub index: usize,
    /// Original file name
    pub file_name: String,
}

/// Signed upload target plus what to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignResponse {
    /// Where and with which token to upload
    pub upload: SignedUpload,
    /// Image or video
    pub kind: MediaKind,
    /// Content type to send with the body
    pub content_type: String,
    /// URL the object will be served under
    pub public_url: String,
}

/// Result of a pre-signed upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Object name
    pub name: String,
    /// Public URL
    pub url: String,
    /// Stored bytes
    pub size: u64,
}

/// Map bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapResponse {
    /// Browser key for the map SDK, if configured
    pub api_key: Option<String>,
    /// Center and markers
    #[serde(flatten)]
    pub view: MapView,
}

// =============================================================================
// Router
// =============================================================================

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sections/:section", get(get_section))
        .route(
            "/api/admin/sections/:section",
            get(admin_get_section).put(admin_put_section),
        )
        .route("/api/admin/media/sign", post(sign_upload))
        .route("/api/admin/media/gc", post(sweep_media))
        .route("/api/locations/map", get(locations_map))
        .route(
            "/storage/upload/:token",
            put(upload_object).layer(DefaultBodyLimit::max(MEDIA_UPLOAD_BYTES_MAX)),
        )
        .route("/storage/public/*path", get(public_object))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok", "version": crate::APP_VERSION }))
}

async fn get_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> ApiResult<SectionView> {
    let kind = parse_section(&section)?;
    let (content, source) = render_json(&state.client, kind).await;
    Ok(Json(SectionView {
        section: kind.as_str().to_string(),
        content,
        source,
    }))
}

async fn admin_get_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    headers: HeaderMap,
) -> ApiResult<EditorSnapshot> {
    state.authorize(&headers).await?;
    let kind = parse_section(&section)?;
    Ok(Json(load_json(&state.client, kind).await?))
}

async fn admin_put_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SaveRequest>,
) -> ApiResult<SaveOutcome> {
    let profile = state.authorize(&headers).await?;
    let kind = parse_section(&section)?;
    let outcome = save_json(
        &state.client,
        kind,
        &request.content,
        request.base_version,
        Some(state.config.media_gc_grace_ms),
    )
    .await?;
    tracing::info!(section = %kind, subject = %profile.subject, version = outcome.version(), "Section saved via API");
    Ok(Json(outcome))
}

async fn sign_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SignRequest>,
) -> ApiResult<SignResponse> {
    state.authorize(&headers).await?;
    let kind = parse_section(&request.section)?;
    let prefix = for_section!(kind, S => S::MEDIA_PREFIX);

    let media_kind = MediaKind::classify(&request.file_name);
    let ext = stored_extension(media_kind, &request.file_name);
    let name = object_name(prefix, request.index, state.client.clock().now_ms(), &ext);

    let media = state.client.media();
    let upload = media.create_signed_upload(&name).await?;
    Ok(Json(SignResponse {
        public_url: media.public_url(&name),
        upload,
        kind: media_kind,
        content_type: content_type_for(&ext).to_string(),
    }))
}

async fn upload_object(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UploadResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let media = state.client.media();
    let object = media.upload_signed(&token, content_type, body, None).await?;
    Ok(Json(UploadResponse {
        url: media.public_url(&object.name),
        name: object.name,
        size: object.size,
    }))
}

async fn public_object(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let media = state.client.media();
    let name = match path.split_once('/') {
        Some((bucket, name)) if bucket == media.bucket() => name,
        _ => return Err(ApiError::ObjectNotFound(path)),
    };
    let (object, body) = media
        .get(name)
        .await?
        .ok_or_else(|| ApiError::ObjectNotFound(name.to_string()))?;
    Ok(([(header::CONTENT_TYPE, object.content_type)], body).into_response())
}

async fn sweep_media(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SweepReport> {
    state.authorize(&headers).await?;
    let report = state
        .client
        .collector()
        .sweep(state.config.media_gc_grace_ms)
        .await?;
    Ok(Json(report))
}

async fn locations_map(State(state): State<AppState>) -> Json<MapResponse> {
    let rendered = state.client.renderer::<LocationsContent>().load().await;
    Json(MapResponse {
        api_key: state.config.maps_api_key.clone(),
        view: rendered.content.map_view(),
    })
}

// =============================================================================
// Tests
// =============================================================================
