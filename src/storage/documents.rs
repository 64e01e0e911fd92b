use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::ObjectStore;
use crate::error::StoreError;

const DOCUMENT_ROOT: &str = "db";

/// A typed collection of JSON documents stored in an [`ObjectStore`].
///
/// Each document lives at `db/<collection>/<id>.json`. Ids must be safe path
/// segments; callers use uuids or hex digests.
pub struct Collection<T, S: ObjectStore> {
    store: Arc<S>,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S: ObjectStore> Clone for Collection<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T, S> Collection<T, S>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    S: ObjectStore,
{
    pub fn new(store: Arc<S>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _marker: PhantomData,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn prefix(&self) -> String {
        format!("{}/{}/", DOCUMENT_ROOT, self.name)
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}.json", self.prefix(), id)
    }

    /// Load a document, returning `None` if it does not exist.
    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        let key = self.key(id);
        match self.store.get(&key).await {
            Ok(object) => serde_json::from_slice(&object.data)
                .map(Some)
                .map_err(|e| StoreError::Document {
                    key,
                    message: e.to_string(),
                }),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether a document exists.
    pub async fn contains(&self, id: &str) -> Result<bool, StoreError> {
        match self.store.head(&self.key(id)).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create or replace a document.
    pub async fn put(&self, id: &str, document: &T) -> Result<(), StoreError> {
        let key = self.key(id);
        let body = serde_json::to_vec(document).map_err(|e| StoreError::Document {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.store
            .put(&key, Bytes::from(body), "application/json")
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(&self.key(id)).await
    }

    /// Load every document in the collection.
    ///
    /// Documents that fail to decode are skipped with a warning so that one
    /// corrupt entry does not hide the rest.
    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        let keys = self.store.list(&self.prefix()).await?;
        let mut documents = Vec::with_capacity(keys.len());

        for key in keys.iter().filter(|k| k.ends_with(".json")) {
            let object = match self.store.get(key).await {
                Ok(object) => object,
                // Deleted between list and get
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            match serde_json::from_slice(&object.data) {
                Ok(document) => documents.push(document),
                Err(e) => warn!(key = %key, "Skipping undecodable document: {}", e),
            }
        }

        Ok(documents)
    }
}
