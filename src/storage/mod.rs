//! Object storage layer.
//!
//! Photos and JSON documents (users, albums) share a single key/value
//! object store:
//!
//! ```text
//! images/<millis>_<name>        uploaded photos
//! db/users/<email-hash>.json    user documents
//! db/albums/<album-id>.json     album documents
//! ```
//!
//! [`S3ObjectStore`] is the production backend; [`MemoryObjectStore`] keeps
//! everything in process for development and tests.

mod documents;
mod memory;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

pub use documents::Collection;
pub use memory::MemoryObjectStore;
pub use s3::{create_s3_client, S3ObjectStore};

/// Key prefix under which photos are stored.
pub const IMAGES_PREFIX: &str = "images/";

/// Object bytes together with the content type recorded at upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// Minimal object-store interface used by the services.
///
/// Keys are `/`-separated strings relative to the store root.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Fetch an object. Missing keys yield [`StoreError::NotFound`].
    async fn get(&self, key: &str) -> Result<StoredObject, StoreError>;

    /// Size in bytes of an object. Missing keys yield [`StoreError::NotFound`].
    async fn head(&self, key: &str) -> Result<u64, StoreError>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys starting with `prefix`, in lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Human-readable location of the store (for logs).
    fn identifier(&self) -> &str;
}

/// Object key of a stored photo.
pub fn image_key(filename: &str) -> String {
    format!("{}{}", IMAGES_PREFIX, filename)
}
