//! Albums and share links.
//!
//! An album belongs to one user and holds photo URLs ordered newest first.
//! The owner can publish it through a share link (`/share/<album>/<share>`)
//! which visitors exchange, optionally with a password, for a guest token
//! scoped to that album.

mod share;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::account::{PasswordHasher, Principal, ShareMode, TokenIssuer};
use crate::error::AlbumError;
use crate::photo::{filename_from_url, sort_urls_desc};
use crate::storage::{Collection, ObjectStore};

pub use share::{
    validate_channel, EnsuredShare, ShareEvent, ShareInfo, ShareLink, MAX_CHANNEL_CHARS,
};

/// Longest accepted album title.
pub const MAX_TITLE_CHARS: usize = 120;

/// Share events kept per album; older ones are dropped.
pub const MAX_SHARE_EVENTS: usize = 100;

/// Default lifetime of a share link (30 days).
pub const DEFAULT_SHARE_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Stored album document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    /// Owning user id
    pub owner: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub share: Option<ShareLink>,
    #[serde(default)]
    pub share_events: Vec<ShareEvent>,
    pub created_at: DateTime<Utc>,
}

/// Album fields returned to clients. Share password hashes and tracking
/// history stay server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub photo_urls: Vec<String>,
    pub cover_url: Option<String>,
    pub share_id: Option<String>,
    pub share_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Album> for AlbumView {
    fn from(album: &Album) -> Self {
        Self {
            id: album.id.clone(),
            title: album.title.clone(),
            photo_urls: album.photo_urls.clone(),
            cover_url: album.cover_url.clone(),
            share_id: album.share.as_ref().map(|s| s.share_id.clone()),
            share_expires_at: album.share.as_ref().map(|s| s.expires_at),
            created_at: album.created_at,
        }
    }
}

/// Trim and check an album title.
pub fn validate_title(title: &str) -> Result<String, AlbumError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AlbumError::InvalidTitle {
            reason: "title is required".to_string(),
        });
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AlbumError::InvalidTitle {
            reason: format!("title longer than {} characters", MAX_TITLE_CHARS),
        });
    }
    Ok(title.to_string())
}

/// Merge `incoming` photo URLs into `existing`, de-duplicated and newest first.
pub fn merge_photo_urls(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let merged = existing
        .iter()
        .chain(incoming.iter())
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    sort_urls_desc(merged)
}

/// Album management and share links.
pub struct AlbumService<S: ObjectStore> {
    albums: Collection<Album, S>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    public_base_url: String,
    // Serialises read-modify-write cycles on album documents
    updates: Mutex<()>,
}

impl<S: ObjectStore> AlbumService<S> {
    pub fn new(
        store: Arc<S>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
        public_base_url: Option<&str>,
    ) -> Self {
        Self {
            albums: Collection::new(store, "albums"),
            hasher,
            tokens,
            public_base_url: public_base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            updates: Mutex::new(()),
        }
    }

    /// Public URL visitors open for a share link.
    pub fn share_url(&self, album_id: &str, share_id: &str) -> String {
        format!("{}/share/{}/{}", self.public_base_url, album_id, share_id)
    }

    /// Albums owned by `owner`, newest first.
    pub async fn mine(&self, owner: &str) -> Result<Vec<Album>, AlbumError> {
        let mut albums = self
            .albums
            .list()
            .await?
            .into_iter()
            .filter(|a| a.owner == owner)
            .collect::<Vec<_>>();
        albums.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(albums)
    }

    /// Create an empty album.
    pub async fn create(&self, owner: &str, title: &str) -> Result<Album, AlbumError> {
        let album = Album {
            id: Uuid::new_v4().to_string(),
            title: validate_title(title)?,
            owner: owner.to_string(),
            photo_urls: Vec::new(),
            cover_url: None,
            share: None,
            share_events: Vec::new(),
            created_at: Utc::now(),
        };
        self.albums.put(&album.id, &album).await?;

        info!(album_id = %album.id, owner = %owner, "Created album");
        Ok(album)
    }

    /// Load an album by id.
    pub async fn get(&self, id: &str) -> Result<Album, AlbumError> {
        if Uuid::parse_str(id).is_err() {
            return Err(not_found(id));
        }
        self.albums.get(id).await?.ok_or_else(|| not_found(id))
    }

    /// Load an album on behalf of `principal`.
    ///
    /// Owners have full access. Guests must hold a token for this album whose
    /// share link is still current; writes additionally need
    /// [`ShareMode::Add`].
    pub async fn authorize(
        &self,
        principal: &Principal,
        id: &str,
        need_write: bool,
    ) -> Result<Album, AlbumError> {
        let album = self.get(id).await?;

        match principal {
            Principal::User { id: user_id, .. } => {
                if album.owner != *user_id {
                    return Err(forbidden(id));
                }
            }
            Principal::Guest {
                album_id,
                share_id,
                mode,
            } => {
                if album_id != id {
                    return Err(forbidden(id));
                }
                match album.share {
                    Some(ref link) if link.share_id == *share_id => {
                        if link.is_expired() {
                            return Err(AlbumError::ShareExpired);
                        }
                    }
                    _ => return Err(forbidden(id)),
                }
                if need_write && *mode != ShareMode::Add {
                    return Err(forbidden(id));
                }
            }
        }

        Ok(album)
    }

    async fn owned(&self, owner: &str, id: &str) -> Result<Album, AlbumError> {
        let album = self.get(id).await?;
        if album.owner != owner {
            return Err(forbidden(id));
        }
        Ok(album)
    }

    /// Delete an album. Its photos stay in storage.
    pub async fn delete(&self, owner: &str, id: &str) -> Result<(), AlbumError> {
        let _guard = self.updates.lock().await;
        self.owned(owner, id).await?;
        self.albums.delete(id).await?;

        info!(album_id = %id, "Deleted album");
        Ok(())
    }

    /// Make sure the album has a live share link.
    ///
    /// A live link is reused; a missing or expired one is replaced with a new
    /// share id valid for `ttl`. A non-empty `password` (re)sets the access
    /// password on the resulting link.
    pub async fn ensure_share(
        &self,
        owner: &str,
        id: &str,
        password: Option<&str>,
        ttl: Duration,
    ) -> Result<EnsuredShare, AlbumError> {
        let password_hash = match password.filter(|p| !p.is_empty()) {
            Some(p) => Some(self.hasher.spawn_hash(p).await?),
            None => None,
        };

        let _guard = self.updates.lock().await;
        let mut album = self.owned(owner, id).await?;

        let (mut link, created) = match album.share.take() {
            Some(link) if !link.is_expired() => (link, false),
            _ => {
                let expires_at = Utc::now()
                    + chrono::Duration::from_std(ttl)
                        .unwrap_or_else(|_| chrono::Duration::days(30));
                (ShareLink::generate(expires_at, None), true)
            }
        };
        if password_hash.is_some() {
            link.password_hash = password_hash;
        }

        let ensured = EnsuredShare {
            share_id: link.share_id.clone(),
            share_link: self.share_url(&album.id, &link.share_id),
            expires_at: link.expires_at,
            created,
        };
        album.share = Some(link);
        self.albums.put(&album.id, &album).await?;

        if created {
            info!(album_id = %id, "Created share link");
        }
        Ok(ensured)
    }

    /// Remove the album's share link. Outstanding guest tokens stop working.
    pub async fn revoke_share(&self, owner: &str, id: &str) -> Result<(), AlbumError> {
        let _guard = self.updates.lock().await;
        let mut album = self.owned(owner, id).await?;
        if album.share.take().is_some() {
            self.albums.put(&album.id, &album).await?;
            info!(album_id = %id, "Revoked share link");
        }
        Ok(())
    }

    fn resolve_link<'a>(album: &'a Album, share_id: &str) -> Result<&'a ShareLink, AlbumError> {
        album
            .share
            .as_ref()
            .filter(|link| link.share_id == share_id)
            .ok_or(AlbumError::ShareNotFound)
    }

    /// Describe a share link without granting access.
    pub async fn share_info(&self, id: &str, share_id: &str) -> Result<ShareInfo, AlbumError> {
        let album = self.get(id).await.map_err(share_lookup_error)?;
        let link = Self::resolve_link(&album, share_id)?;

        Ok(ShareInfo {
            title: album.title.clone(),
            expired: link.is_expired(),
            protected: link.is_protected(),
            cover_url: album.cover_url.clone(),
        })
    }

    /// Exchange a share link (and password, when set) for a guest token.
    pub async fn grant_access(
        &self,
        id: &str,
        share_id: &str,
        mode: ShareMode,
        password: Option<&str>,
    ) -> Result<String, AlbumError> {
        let album = self.get(id).await.map_err(share_lookup_error)?;
        let link = Self::resolve_link(&album, share_id)?;

        if link.is_expired() {
            debug!(album_id = %id, "Share link expired");
            return Err(AlbumError::ShareExpired);
        }

        if let Some(ref hash) = link.password_hash {
            let password = password.unwrap_or_default();
            if password.is_empty() || !self.hasher.spawn_verify(password, hash).await? {
                return Err(AlbumError::InvalidSharePassword);
            }
        }

        let token = self.tokens.issue_guest(&album.id, &link.share_id, mode)?;
        info!(album_id = %id, mode = ?mode, "Granted share access");
        Ok(token)
    }

    /// Record that the owner shared the album on `channel`.
    pub async fn track_share(
        &self,
        owner: &str,
        id: &str,
        channel: &str,
        ok: bool,
        meta: Option<serde_json::Value>,
    ) -> Result<(), AlbumError> {
        let channel =
            validate_channel(channel).map_err(|reason| AlbumError::InvalidShareEvent { reason })?;

        let _guard = self.updates.lock().await;
        let mut album = self.owned(owner, id).await?;

        album.share_events.push(ShareEvent {
            channel,
            ok,
            meta,
            at: Utc::now(),
        });
        if album.share_events.len() > MAX_SHARE_EVENTS {
            let excess = album.share_events.len() - MAX_SHARE_EVENTS;
            album.share_events.drain(..excess);
        }

        self.albums.put(&album.id, &album).await?;
        Ok(())
    }

    /// Add uploaded photo URLs to an album.
    ///
    /// `cover_index` picks the cover among `urls`; without one, an album that
    /// has no cover yet takes the first new photo.
    pub async fn attach_photos(
        &self,
        id: &str,
        urls: &[String],
        cover_index: Option<usize>,
    ) -> Result<Album, AlbumError> {
        let _guard = self.updates.lock().await;
        let mut album = self.get(id).await?;

        album.photo_urls = merge_photo_urls(&album.photo_urls, urls);
        match cover_index.and_then(|i| urls.get(i)) {
            Some(cover) => album.cover_url = Some(cover.clone()),
            None if album.cover_url.is_none() => album.cover_url = urls.first().cloned(),
            None => {}
        }

        self.albums.put(&album.id, &album).await?;
        debug!(album_id = %id, added = urls.len(), "Attached photos");
        Ok(album)
    }

    /// Remove a deleted photo from every album that references it.
    ///
    /// Returns the number of albums changed. A removed cover falls back to
    /// the newest remaining photo.
    pub async fn detach_photo(&self, filename: &str) -> Result<usize, AlbumError> {
        let _guard = self.updates.lock().await;
        let matches = |url: &String| filename_from_url(url).as_deref() == Some(filename);

        let mut changed = 0;
        for mut album in self.albums.list().await? {
            let before = album.photo_urls.len();
            album.photo_urls.retain(|url| !matches(url));
            let cover_removed = album.cover_url.as_ref().is_some_and(matches);

            if album.photo_urls.len() == before && !cover_removed {
                continue;
            }
            if cover_removed {
                album.cover_url = album.photo_urls.first().cloned();
            }
            self.albums.put(&album.id, &album).await?;
            changed += 1;
        }
        Ok(changed)
    }
}

/// An unknown album behind a share link reads as an unknown link. Storage
/// failures pass through.
fn share_lookup_error(err: AlbumError) -> AlbumError {
    match err {
        AlbumError::NotFound { .. } => AlbumError::ShareNotFound,
        other => other,
    }
}

fn not_found(id: &str) -> AlbumError {
    AlbumError::NotFound {
        album_id: id.to_string(),
    }
}

fn forbidden(id: &str) -> AlbumError {
    AlbumError::Forbidden {
        album_id: id.to_string(),
    }
}
