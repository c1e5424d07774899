//! Object-store access for the shared bundle, §4.6.

pub mod backend;
pub mod s3_backend;

pub use backend::{DownloadUrl, StorageBackend, UploadUrl};
pub use s3_backend::S3Backend;
