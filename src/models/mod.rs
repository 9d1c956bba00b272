//! Core data models for the lost-item tracker.
//!
//! `Item` is the only persisted entity. It serializes as camelCase JSON both
//! in the stored record and over HTTP.

pub mod item;
pub mod sort;
