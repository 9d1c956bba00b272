pub mod item_store;
pub mod photo_resolver;
pub mod record_store;

use item_store::ItemStore;
use photo_resolver::FilePhotoResolver;
use record_store::SqliteRecordStore;

/// The store wiring used by the HTTP server.
pub type AppStore = ItemStore<SqliteRecordStore, FilePhotoResolver>;
