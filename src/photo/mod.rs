//! Photo storage: uploads, downloads, deletion and zip archives.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                PhotoService                  │
//! │  upload · list · fetch · delete · archive    │
//! └───────┬──────────────────────────┬───────────┘
//!         │                          │
//!         ▼                          ▼
//! ┌───────────────┐        ┌───────────────────┐
//! │  ImageCache   │        │   ObjectStore     │
//! │ (LRU, bytes)  │        │ images/<name>     │
//! └───────────────┘        └───────────────────┘
//! ```

mod archive;
mod cache;
pub mod naming;

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PhotoError, StoreError};
use crate::storage::{image_key, ObjectStore, IMAGES_PREFIX};

pub use archive::{archive_name, build_zip, ArchiveEntry};
pub use cache::{CachedImage, ImageCache, DEFAULT_IMAGE_CACHE_CAPACITY};
pub use naming::{
    filename_from_url, is_valid_filename, sanitize_filename, sort_urls_desc, stored_filename,
    timestamp_of,
};

/// Default per-file upload limit (20MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Default limit for selected-photo zip downloads (100MB).
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 100 * 1024 * 1024;

/// Default limit for the full-gallery zip download (1GB).
pub const DEFAULT_MAX_DOWNLOAD_ALL_BYTES: u64 = 1024 * 1024 * 1024;

/// Image formats accepted for upload.
const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Size limits applied by [`PhotoService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoLimits {
    /// Largest single upload in bytes
    pub max_upload_bytes: u64,
    /// Largest total for a selected-photo archive in bytes
    pub max_archive_bytes: u64,
    /// Largest total for the full-gallery archive in bytes. The archive is
    /// built in memory, so this bounds the memory one download may use.
    pub max_download_all_bytes: u64,
}

impl Default for PhotoLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            max_download_all_bytes: DEFAULT_MAX_DOWNLOAD_ALL_BYTES,
        }
    }
}

/// A file received in an upload request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Client-side file name
    pub name: String,
    /// Declared content type, if any
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A file refused during upload, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    /// URLs of stored photos, in upload order
    pub uploaded: Vec<String>,
    /// Stored file names, parallel to `uploaded`
    #[serde(skip)]
    pub filenames: Vec<String>,
    /// Position of each stored file among the submitted files, parallel to
    /// `uploaded`
    #[serde(skip)]
    pub source_indices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedFile>,
}

impl UploadReport {
    /// Translate the position of a submitted file into its position in
    /// `uploaded`. `None` if that file was rejected or never submitted.
    pub fn stored_position(&self, submitted: usize) -> Option<usize> {
        self.source_indices.iter().position(|&i| i == submitted)
    }
}

/// A photo read back for download.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub data: Bytes,
    pub content_type: String,
    pub cache_hit: bool,
}

/// Photo operations over an [`ObjectStore`].
pub struct PhotoService<S: ObjectStore> {
    store: Arc<S>,
    cache: ImageCache,
    public_base_url: String,
    limits: PhotoLimits,
}

impl<S: ObjectStore> PhotoService<S> {
    /// Create a service. Photo URLs are `<public_base_url>/images/<name>`,
    /// or root-relative when no base URL is given.
    pub fn new(
        store: Arc<S>,
        cache: ImageCache,
        public_base_url: Option<&str>,
        limits: PhotoLimits,
    ) -> Self {
        Self {
            store,
            cache,
            public_base_url: public_base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            limits,
        }
    }

    pub fn limits(&self) -> PhotoLimits {
        self.limits
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Public URL of a stored photo.
    pub fn url_for(&self, filename: &str) -> String {
        format!(
            "{}/images/{}",
            self.public_base_url,
            urlencoding::encode(filename)
        )
    }

    /// Stored file names, newest first.
    pub async fn list_filenames(&self) -> Result<Vec<String>, PhotoError> {
        let names = self
            .store
            .list(IMAGES_PREFIX)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(IMAGES_PREFIX).map(|s| s.to_string()))
            .filter(|name| is_valid_filename(name))
            .collect::<Vec<_>>();
        Ok(sort_urls_desc(names))
    }

    /// Photo URLs, newest first.
    pub async fn list(&self) -> Result<Vec<String>, PhotoError> {
        Ok(self
            .list_filenames()
            .await?
            .iter()
            .map(|name| self.url_for(name))
            .collect())
    }

    /// Store uploaded files.
    ///
    /// Each file is checked on its own: the declared type must be `image/*`
    /// (when declared), the bytes must sniff as an accepted image format and
    /// the size must be within the per-file limit. Refused files are reported
    /// in [`UploadReport::rejected`]; the rest are stored. Fails only when no
    /// files were sent or every file was refused.
    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadReport, PhotoError> {
        if files.is_empty() {
            return Err(PhotoError::NoFiles);
        }

        let mut report = UploadReport::default();
        let mut next_millis = Utc::now().timestamp_millis();
        let mut used: HashSet<String> = HashSet::new();

        for (index, file) in files.into_iter().enumerate() {
            let format = match self.check_upload(&file) {
                Ok(format) => format,
                Err(reason) => {
                    debug!(name = %file.name, reason = %reason, "Upload rejected");
                    report.rejected.push(RejectedFile {
                        name: file.name,
                        reason,
                    });
                    continue;
                }
            };

            let filename = loop {
                let candidate = stored_filename(next_millis, &file.name);
                next_millis += 1;
                if used.contains(&candidate) {
                    continue;
                }
                match self.store.head(&image_key(&candidate)).await {
                    Err(StoreError::NotFound(_)) => break candidate,
                    Ok(_) => continue,
                    Err(e) => return Err(e.into()),
                }
            };

            self.store
                .put(&image_key(&filename), file.data, format.to_mime_type())
                .await?;
            used.insert(filename.clone());
            report.uploaded.push(self.url_for(&filename));
            report.filenames.push(filename);
            report.source_indices.push(index);
        }

        if report.uploaded.is_empty() {
            let reasons = report
                .rejected
                .iter()
                .map(|r| format!("{}: {}", r.name, r.reason))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PhotoError::Rejected(reasons));
        }

        info!(
            uploaded = report.uploaded.len(),
            rejected = report.rejected.len(),
            "Stored uploaded photos"
        );
        Ok(report)
    }

    fn check_upload(&self, file: &UploadFile) -> Result<ImageFormat, String> {
        if let Some(ref declared) = file.content_type {
            if !declared.starts_with("image/") {
                return Err(format!("not an image ({})", declared));
            }
        }
        if file.data.is_empty() {
            return Err("empty file".to_string());
        }
        if file.data.len() as u64 > self.limits.max_upload_bytes {
            return Err(format!(
                "file too large ({} bytes, limit {} bytes)",
                file.data.len(),
                self.limits.max_upload_bytes
            ));
        }
        match image::guess_format(&file.data) {
            Ok(format) if ACCEPTED_FORMATS.contains(&format) => Ok(format),
            Ok(format) => Err(format!("unsupported image format {:?}", format)),
            Err(_) => Err("unrecognised image data".to_string()),
        }
    }

    /// Read a photo, serving from cache when possible.
    pub async fn fetch(&self, name: &str) -> Result<FetchedImage, PhotoError> {
        if !is_valid_filename(name) {
            return Err(PhotoError::InvalidName {
                name: name.to_string(),
            });
        }

        if let Some(cached) = self.cache.get(name).await {
            return Ok(FetchedImage {
                data: cached.data,
                content_type: cached.content_type,
                cache_hit: true,
            });
        }

        let object = self
            .store
            .get(&image_key(name))
            .await
            .map_err(|e| not_found_as(e, name))?;

        let content_type = object
            .content_type
            .filter(|ct| ct.starts_with("image/"))
            .or_else(|| {
                image::guess_format(&object.data)
                    .ok()
                    .map(|f| f.to_mime_type().to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        self.cache
            .put(
                name,
                CachedImage {
                    data: object.data.clone(),
                    content_type: content_type.clone(),
                },
            )
            .await;

        Ok(FetchedImage {
            data: object.data,
            content_type,
            cache_hit: false,
        })
    }

    /// Delete a stored photo.
    pub async fn delete(&self, name: &str) -> Result<(), PhotoError> {
        if !is_valid_filename(name) {
            return Err(PhotoError::InvalidName {
                name: name.to_string(),
            });
        }

        let key = image_key(name);
        self.store
            .head(&key)
            .await
            .map_err(|e| not_found_as(e, name))?;
        self.store.delete(&key).await?;
        self.cache.remove(name).await;

        info!(name = %name, "Deleted photo");
        Ok(())
    }

    /// Zip the named photos, enforcing the archive size limit.
    ///
    /// Duplicate names are collapsed; unknown names fail the whole request.
    pub async fn archive(&self, names: &[String]) -> Result<Bytes, PhotoError> {
        let mut seen = HashSet::new();
        let names: Vec<&String> = names.iter().filter(|n| seen.insert(n.as_str())).collect();
        if names.is_empty() {
            return Err(PhotoError::EmptySelection);
        }

        let mut total = 0u64;
        for name in &names {
            if !is_valid_filename(name) {
                return Err(PhotoError::InvalidName {
                    name: name.to_string(),
                });
            }
            total += self
                .store
                .head(&image_key(name))
                .await
                .map_err(|e| not_found_as(e, name))?;
        }

        let limit = self.limits.max_archive_bytes;
        if total > limit {
            return Err(PhotoError::ArchiveTooLarge { total, limit });
        }

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let object = self
                .store
                .get(&image_key(name))
                .await
                .map_err(|e| not_found_as(e, name))?;
            entries.push(ArchiveEntry {
                name: name.clone(),
                data: object.data,
            });
        }

        debug!(files = entries.len(), bytes = total, "Building photo archive");
        build_zip(&entries)
    }

    /// Zip every stored photo.
    ///
    /// Bounded by `max_download_all_bytes` rather than the selection limit.
    /// Sizes are checked before any photo is read.
    pub async fn archive_all(&self) -> Result<Bytes, PhotoError> {
        let limit = self.limits.max_download_all_bytes;
        let mut names = Vec::new();
        let mut total = 0u64;
        for name in self.list_filenames().await? {
            match self.store.head(&image_key(&name)).await {
                Ok(size) => {
                    total += size;
                    names.push(name);
                }
                // Deleted since listing
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if total > limit {
            warn!(bytes = total, limit, "Full photo archive over limit");
            return Err(PhotoError::ArchiveTooLarge { total, limit });
        }

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            match self.store.get(&image_key(&name)).await {
                Ok(object) => entries.push(ArchiveEntry {
                    name,
                    data: object.data,
                }),
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        build_zip(&entries)
    }
}

fn not_found_as(err: StoreError, name: &str) -> PhotoError {
    match err {
        StoreError::NotFound(_) => PhotoError::NotFound {
            name: name.to_string(),
        },
        other => PhotoError::Store(other),
    }
}
