//! Self-sizing feedback from hosted content to the table.
//!
//! Hosted views report their measured height after layout passes. Heights
//! land in the owning list's [`HeightCache`]; when a value actually changes,
//! one empty batch refresh is posted to the main queue so the table queries
//! heights again. Further changes in the same turn ride on that refresh.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use horizon_trellis_core::{Scene, ViewId};
use parking_lot::Mutex;

use crate::cell::{CellAxis, SizeKind};
use crate::model::{IndexPath, PathDelta};
use crate::support::ListSupport;
use crate::targets;

/// Measured heights keyed by row kind and index path.
#[derive(Debug, Clone, Default)]
pub struct HeightCache {
    heights: HashMap<(SizeKind, IndexPath), f32>,
}

impl HeightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: SizeKind, index_path: IndexPath) -> Option<f32> {
        self.heights.get(&(kind, index_path)).copied()
    }

    /// Store a height. Returns whether the cached value changed.
    pub fn update(&mut self, kind: SizeKind, index_path: IndexPath, height: f32) -> bool {
        let previous = self.heights.insert((kind, index_path), height);
        previous != Some(height)
    }

    pub fn clear(&mut self) {
        self.heights.clear();
    }

    /// Move cached heights along with their rows; heights of removed rows
    /// are dropped.
    pub(crate) fn remap(&mut self, delta: &PathDelta) {
        self.heights = std::mem::take(&mut self.heights)
            .into_iter()
            .filter_map(|((kind, path), height)| {
                delta.map(kind, path).map(|moved| ((kind, moved), height))
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}

/// Tag set on a hosted view once it has reported a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingTag {
    pub axis: CellAxis,
    pub kind: SizeKind,
    pub index_path: IndexPath,
}

/// Payload on a table view pointing back at its list.
pub(crate) struct TableLink(pub(crate) Weak<Mutex<ListSupport>>);

/// Feed a measured height into the nearest table's cache.
pub(crate) fn report_height(
    scene: &mut Scene,
    view: ViewId,
    kind: SizeKind,
    index_path: IndexPath,
    height: f32,
) {
    let Some(support) = scene
        .find_ancestor_with_payload::<TableLink>(view)
        .and_then(|table| scene.payload::<TableLink>(table))
        .and_then(|link| link.0.upgrade())
    else {
        tracing::trace!(target: targets::SIZING, ?view, "measured view is not inside a list");
        return;
    };

    let schedule = support.lock().record_height(kind, index_path, height);
    if !schedule {
        return;
    }

    tracing::debug!(target: targets::SIZING, ?kind, %index_path, height, "scheduling height refresh");
    let weak: Weak<Mutex<ListSupport>> = Arc::downgrade(&support);
    scene.post(move |_| {
        if let Some(support) = weak.upgrade() {
            support.lock().run_height_refresh();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_reports_changes_only() {
        let mut cache = HeightCache::new();
        let path = IndexPath::new(0, 2);

        assert!(cache.update(SizeKind::Row, path, 50.0));
        assert!(!cache.update(SizeKind::Row, path, 50.0));
        assert!(cache.update(SizeKind::Row, path, 64.0));
        assert!(cache.update(SizeKind::Header, IndexPath::new(0, 0), 20.0));

        assert_eq!(cache.get(SizeKind::Row, path), Some(64.0));
        assert_eq!(cache.get(SizeKind::Footer, path), None);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remap_follows_deleted_sections() {
        let mut cache = HeightCache::new();
        cache.update(SizeKind::Header, IndexPath::new(0, 0), 30.0);
        cache.update(SizeKind::Row, IndexPath::new(1, 0), 44.0);
        cache.update(SizeKind::Row, IndexPath::new(2, 1), 60.0);

        cache.remap(&PathDelta::DeleteSections([1].into_iter().collect()));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(SizeKind::Header, IndexPath::new(0, 0)), Some(30.0));
        assert_eq!(cache.get(SizeKind::Row, IndexPath::new(1, 1)), Some(60.0));
    }
}
