//! In-memory preview store.
//!
//! Holds the bytes of selected images so the presentation layer can show
//! them. Handles are revoked when an image is replaced or the session resets.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use meterlens_core::PreviewHandle;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// URL prefix previews are served under.
pub const PREVIEW_PREFIX: &str = "/preview";

#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Clone, Default)]
pub struct PreviewStore {
    entries: Arc<RwLock<HashMap<String, PreviewEntry>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store image bytes and return a handle with a fresh id.
    pub async fn register(&self, mime_type: &str, data: Bytes) -> PreviewHandle {
        let id = Uuid::new_v4().simple().to_string();
        let handle = PreviewHandle {
            url: format!("{PREVIEW_PREFIX}/{id}"),
            id: id.clone(),
        };
        debug!(preview = %id, bytes = data.len(), "Registered preview");
        self.entries.write().await.insert(
            id,
            PreviewEntry {
                mime_type: mime_type.to_string(),
                data,
            },
        );
        handle
    }

    pub async fn get(&self, id: &str) -> Option<PreviewEntry> {
        self.entries.read().await.get(id).cloned()
    }

    /// Release a preview. Returns `false` if it was already gone.
    pub async fn revoke(&self, handle: &PreviewHandle) -> bool {
        let removed = self.entries.write().await.remove(&handle.id).is_some();
        if removed {
            debug!(preview = %handle.id, "Revoked preview");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_yields_non_empty_handle() {
        let store = PreviewStore::new();
        let handle = store.register("image/png", Bytes::from_static(b"png")).await;
        assert!(!handle.id.is_empty());
        assert_eq!(handle.url, format!("/preview/{}", handle.id));
        assert_eq!(store.get(&handle.id).await.unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn revoke_releases_entry_once() {
        let store = PreviewStore::new();
        let handle = store.register("image/jpeg", Bytes::from_static(b"jpg")).await;
        assert!(store.revoke(&handle).await);
        assert!(!store.revoke(&handle).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn handles_are_unique() {
        let store = PreviewStore::new();
        let a = store.register("image/png", Bytes::new()).await;
        let b = store.register("image/png", Bytes::new()).await;
        assert_ne!(a.id, b.id);
        assert_eq!(store.len().await, 2);
    }
}
