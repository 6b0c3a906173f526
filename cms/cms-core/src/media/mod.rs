//! Media - object storage, transcoding, uploads and collection
//!
//! TigerStyle: Abstract storage with simulation-first testing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌───────────────────────────────┐
//! │  MediaFile   │──▶│ MediaPipeline  │──▶│       MediaStore Trait        │
//! │ (name+bytes) │   │ classify/webp/ │   └───────────────────────────────┘
//! └──────────────┘   │ sign/upload    │          ↑                 ↑
//!                    └────────────────┘   ┌──────┴───────┐ ┌───────┴──────┐
//!                                         │SimMediaStore │ │ FsMediaStore │
//!                    ┌────────────────┐   │  (testing)   │ │ (bucket dir) │
//!                    │ MediaCollector │──▶└──────────────┘ └──────────────┘
//!                    └────────────────┘
//! ```

mod fs;
mod gc;
mod kind;
mod pipeline;
mod sim;
mod store;
mod transcode;

pub use fs::{FsMediaStore, MEDIA_INDEX_FILE_NAME, MEDIA_LOCK_FILE_NAME};
pub use gc::{MediaCollector, SweepReport};
pub use kind::{
    content_type_for, extension, object_name, stored_extension, MediaKind, IMAGE_EXTENSIONS,
    VIDEO_EXTENSIONS, WEBP_CONTENT_TYPE, WEBP_EXTENSION,
};
pub use pipeline::{MediaFile, MediaPipeline};
pub use sim::{SimMediaStore, SIM_BASE_URL};
pub use store::{
    check_object_name, expected_content_type, public_url_for, upload_url_for, MediaError,
    MediaObject, MediaResult, MediaStore, SignedUpload, UploadProgress,
};
pub use transcode::{is_webp, ImageTranscoder, WebpTranscoder};
