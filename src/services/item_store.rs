//! src/services/item_store.rs
//!
//! ItemStore owns the item collection. Every operation runs under one async
//! mutex and follows the same shape: load the full collection, change it,
//! write it back. Photo resources are acquired before the write and released
//! only after the write has committed.

use crate::{
    models::item::{Item, ItemDraft, ItemId, PhotoAction, PhotoRef, PhotoUpload},
    services::{
        photo_resolver::PhotoResolver,
        record_store::{RecordStore, StorageError},
    },
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid item: {0}")]
    Validation(String),
    #[error("item `{0}` not found")]
    NotFound(ItemId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The authoritative item collection plus the photo resources it owns.
///
/// Cloning is cheap and clones share the same lock, so a clone can be handed
/// to every request handler.
pub struct ItemStore<R, P> {
    records: Arc<R>,
    photos: Arc<P>,
    lock: Arc<Mutex<()>>,
}

impl<R, P> Clone for ItemStore<R, P> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            photos: self.photos.clone(),
            lock: self.lock.clone(),
        }
    }
}

impl<R: RecordStore, P: PhotoResolver> ItemStore<R, P> {
    pub fn new(records: R, photos: P) -> Self {
        Self {
            records: Arc::new(records),
            photos: Arc::new(photos),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn photos(&self) -> &P {
        &self.photos
    }

    /// Absent record means nothing has been saved yet.
    async fn load(&self) -> StoreResult<Vec<Item>> {
        Ok(self.records.load().await?.unwrap_or_default())
    }

    /// Release photos whose owning item change has already been committed.
    /// Failures are logged; the collection is already consistent.
    async fn release_committed(&self, photos: impl IntoIterator<Item = PhotoRef>) {
        for photo in photos {
            if let Err(err) = self.photos.release(&photo).await {
                warn!("failed to release photo {}: {}", photo, err);
            }
        }
    }

    /// Persist `items`. If the write fails, `acquired` is released again.
    async fn save_or_rollback(
        &self,
        items: &[Item],
        acquired: Option<&PhotoRef>,
    ) -> StoreResult<()> {
        if let Err(err) = self.records.save(items).await {
            if let Some(photo) = acquired {
                if let Err(release_err) = self.photos.release(photo).await {
                    warn!("failed to roll back photo {}: {}", photo, release_err);
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Add a new item and return its id.
    pub async fn create_item(
        &self,
        draft: ItemDraft,
        photo: Option<PhotoUpload>,
    ) -> StoreResult<ItemId> {
        let draft = normalize_draft(draft)?;
        if let Some(upload) = &photo {
            validate_photo(upload)?;
        }

        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;

        let photo_ref = match photo {
            Some(upload) => Some(self.photos.acquire(upload).await?),
            None => None,
        };

        let now = Utc::now();
        let item = Item {
            id: ItemId::generate(),
            item_name: draft.item_name,
            location: draft.location,
            additional_info: draft.additional_info,
            photo_ref,
            created_at: now,
            updated_at: now,
        };
        let id = item.id.clone();
        let acquired = item.photo_ref.clone();
        items.push(item);

        self.save_or_rollback(&items, acquired.as_ref()).await?;
        info!(item_id = %id, has_photo = acquired.is_some(), "created item");
        Ok(id)
    }

    /// Replace an item's fields and apply `action` to its photo.
    pub async fn update_item(
        &self,
        id: &ItemId,
        draft: ItemDraft,
        action: PhotoAction,
    ) -> StoreResult<ItemId> {
        let draft = normalize_draft(draft)?;
        if let PhotoAction::Replace(upload) = &action {
            validate_photo(upload)?;
        }

        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let index = items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let previous = items[index].photo_ref.clone();
        let (photo_ref, acquired, released) = match action {
            PhotoAction::Keep => (previous, None, None),
            PhotoAction::Remove => (None, None, previous),
            PhotoAction::Replace(upload) => {
                let fresh = self.photos.acquire(upload).await?;
                (Some(fresh.clone()), Some(fresh), previous)
            }
        };

        let item = &mut items[index];
        item.item_name = draft.item_name;
        item.location = draft.location;
        item.additional_info = draft.additional_info;
        item.photo_ref = photo_ref;
        item.updated_at = Utc::now();

        self.save_or_rollback(&items, acquired.as_ref()).await?;
        info!(item_id = %id, "updated item");

        self.release_committed(released).await;
        Ok(id.clone())
    }

    /// Remove an item. Removing an id that is not stored is not an error.
    pub async fn delete_item(&self, id: &ItemId) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;

        let Some(index) = items.iter().position(|item| &item.id == id) else {
            debug!(item_id = %id, "delete of absent item ignored");
            return Ok(());
        };
        let removed = items.remove(index);

        self.records.save(&items).await?;
        info!(item_id = %id, "deleted item");

        self.release_committed(removed.photo_ref).await;
        Ok(())
    }

    /// Remove every item in a single write, then release all photos.
    pub async fn clear_all(&self) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let items = self.load().await?;

        self.records.save(&[]).await?;
        info!(count = items.len(), "cleared all items");

        self.release_committed(items.into_iter().filter_map(|item| item.photo_ref))
            .await;
        Ok(())
    }

    /// Every item in storage order.
    pub async fn list_all(&self) -> StoreResult<Vec<Item>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    pub async fn get_item(&self, id: &ItemId) -> StoreResult<Item> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .into_iter()
            .find(|item| &item.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Items whose name contains `term`, ignoring case, in storage order.
    ///
    /// A blank term matches nothing. Otherwise the term is used as given,
    /// surrounding whitespace included. Case is compared via `to_lowercase`,
    /// which is not full case folding: "Straße" does not match "STRASSE".
    pub async fn search(&self, term: &str) -> StoreResult<Vec<Item>> {
        if term.trim().is_empty() {
            return Ok(Vec::new());
        }
        let needle = term.to_lowercase();

        let _guard = self.lock.lock().await;
        let items = self.load().await?;
        Ok(items
            .into_iter()
            .filter(|item| item.item_name.to_lowercase().contains(&needle))
            .collect())
    }
}

fn normalize_draft(draft: ItemDraft) -> StoreResult<ItemDraft> {
    let item_name = draft.item_name.trim();
    if item_name.is_empty() {
        return Err(StoreError::Validation("itemName must not be empty".into()));
    }
    let location = draft.location.trim();
    if location.is_empty() {
        return Err(StoreError::Validation("location must not be empty".into()));
    }

    Ok(ItemDraft {
        item_name: item_name.to_string(),
        location: location.to_string(),
        additional_info: draft.additional_info.trim().to_string(),
    })
}

fn validate_photo(upload: &PhotoUpload) -> StoreResult<()> {
    if upload.bytes.is_empty() {
        return Err(StoreError::Validation("photo must not be empty".into()));
    }
    if let Some(content_type) = upload.content_type.as_deref() {
        if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(StoreError::Validation(format!(
                "photo must be an image, got `{}`",
                content_type
            )));
        }
    }
    Ok(())
}
