//! Display-time ordering for item lists.
//!
//! The store always returns items in insertion order; views pick one of these
//! orders and project a sorted copy.

use crate::models::item::Item;
use std::{cmp::Ordering, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created first.
    Newest,
    /// Oldest created first.
    Oldest,
    /// Alphabetical by item name, ignoring case. Compares code points, not
    /// locale collation, so "Écharpe" sorts after "zip".
    Name,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "name" => Ok(Self::Name),
            other => Err(format!("unknown sort order `{}`", other)),
        }
    }
}

/// Return a sorted copy of `items`. The input slice is left as is.
///
/// Sorting is stable, so items that compare equal keep their storage order.
pub fn sorted(items: &[Item], order: SortOrder) -> Vec<Item> {
    let mut out = items.to_vec();
    match order {
        SortOrder::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::Name => out.sort_by(|a, b| compare_names(&a.item_name, &b.item_name)),
    }
    out
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
