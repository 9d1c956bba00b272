//! Personal lost-item tracker: record where belongings were last seen, search
//! them by name, and attach photos.
//!
//! [`services::item_store::ItemStore`] is the core. It is generic over a
//! [`services::record_store::RecordStore`] for persistence and a
//! [`services::photo_resolver::PhotoResolver`] for photo payloads; the HTTP
//! layer in [`routes`] wires it to SQLite and the local filesystem.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
