//! Per-user favorite vehicles.
//!
//! Storage is an external concern; [`FavoritesStore`] is the seam and
//! [`InMemoryFavorites`] backs the CLI and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::catalog::VehicleKey;

/// Opaque user identifier from the delivery channel.
pub type UserId = i64;

/// One page of a favorites list. Entry indices are positions in the full
/// list, usable with [`FavoritesStore::remove_matching`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoritesPage {
    pub entries: Vec<(usize, VehicleKey)>,
    /// Zero-based, clamped into range.
    pub page: usize,
    /// At least 1, even for an empty list.
    pub pages: usize,
    pub total: usize,
}

impl FavoritesPage {
    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page + 1 < self.pages
    }
}

/// Slice `list` into the requested page.
#[must_use]
pub fn paginate(list: Vec<VehicleKey>, page: usize, page_size: usize) -> FavoritesPage {
    let page_size = page_size.max(1);
    let total = list.len();
    let pages = total.div_ceil(page_size).max(1);
    let page = page.min(pages - 1);
    let entries = list
        .into_iter()
        .enumerate()
        .skip(page * page_size)
        .take(page_size)
        .collect();
    FavoritesPage {
        entries,
        page,
        pages,
        total,
    }
}

pub trait FavoritesStore: Send + Sync {
    /// Append a vehicle. Returns `false` if it is already in the list.
    fn add(&self, user: UserId, key: VehicleKey) -> bool;

    /// Full list in insertion order.
    fn list(&self, user: UserId) -> Vec<VehicleKey>;

    /// Remove by position.
    fn remove_at(&self, user: UserId, index: usize) -> Option<VehicleKey>;

    /// Remove by position only if that position still holds `key`.
    ///
    /// A stale index (list changed since it was rendered) removes nothing.
    fn remove_matching(&self, user: UserId, index: usize, key: &VehicleKey) -> Option<VehicleKey>;

    fn page(&self, user: UserId, page: usize, page_size: usize) -> FavoritesPage {
        paginate(self.list(user), page, page_size)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFavorites {
    lists: Mutex<HashMap<UserId, Vec<VehicleKey>>>,
}

impl InMemoryFavorites {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Vec<VehicleKey>>> {
        self.lists.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FavoritesStore for InMemoryFavorites {
    fn add(&self, user: UserId, key: VehicleKey) -> bool {
        let mut lists = self.lock();
        let list = lists.entry(user).or_default();
        if list.contains(&key) {
            return false;
        }
        tracing::debug!(user, vehicle = %key, "Favorite added");
        list.push(key);
        true
    }

    fn list(&self, user: UserId) -> Vec<VehicleKey> {
        self.lock().get(&user).cloned().unwrap_or_default()
    }

    fn remove_at(&self, user: UserId, index: usize) -> Option<VehicleKey> {
        let mut lists = self.lock();
        let list = lists.get_mut(&user)?;
        (index < list.len()).then(|| list.remove(index))
    }

    fn remove_matching(&self, user: UserId, index: usize, key: &VehicleKey) -> Option<VehicleKey> {
        let mut lists = self.lock();
        let list = lists.get_mut(&user)?;
        if list.get(index) != Some(key) {
            tracing::debug!(user, index, vehicle = %key, "Stale favorite slot");
            return None;
        }
        Some(list.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(model: &str) -> VehicleKey {
        VehicleKey::new("KIA", model, "2017")
    }

    #[test]
    fn add_skips_duplicates() {
        let store = InMemoryFavorites::new();
        assert!(store.add(1, key("RIO")));
        assert!(!store.add(1, key("RIO")));
        assert!(store.add(1, key("CEED")));
        assert_eq!(store.list(1), vec![key("RIO"), key("CEED")]);
        assert!(store.list(2).is_empty());
    }

    #[test]
    fn remove_at_bounds() {
        let store = InMemoryFavorites::new();
        store.add(1, key("RIO"));
        assert_eq!(store.remove_at(1, 5), None);
        assert_eq!(store.remove_at(1, 0), Some(key("RIO")));
        assert_eq!(store.remove_at(9, 0), None);
    }

    #[test]
    fn double_tap_does_not_remove_neighbor() {
        let store = InMemoryFavorites::new();
        store.add(1, key("RIO"));
        store.add(1, key("CEED"));
        assert_eq!(store.remove_matching(1, 0, &key("RIO")), Some(key("RIO")));
        // Same button pressed again: index 0 now holds CEED.
        assert_eq!(store.remove_matching(1, 0, &key("RIO")), None);
        assert_eq!(store.list(1), vec![key("CEED")]);
    }

    #[test]
    fn pagination_clamps_and_indexes_globally() {
        let list: Vec<_> = (0..7).map(|n| key(&format!("M{n}"))).collect();
        let page = paginate(list.clone(), 1, 5);
        assert_eq!(page.pages, 2);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].0, 5);
        assert!(page.has_prev());
        assert!(!page.has_next());

        let clamped = paginate(list, 99, 5);
        assert_eq!(clamped.page, 1);

        let empty = paginate(Vec::new(), 0, 5);
        assert_eq!(empty.pages, 1);
        assert!(empty.entries.is_empty());
    }
}
