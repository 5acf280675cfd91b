//! The native table the list drives.
//!
//! [`TableHost`] is the seam to the toolkit's table or collection view: the
//! list engine pushes reloads and animated batch updates through it and the
//! host answers data-source queries by calling back into
//! [`UicList`](crate::UicList) later.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::model::IndexPath;

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one animated batch update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(u64);

impl BatchId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Animation used for row and section changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAnimation {
    None,
    Fade,
    Left,
    Right,
    Top,
    Bottom,
    #[default]
    Automatic,
}

/// An animated structural change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableUpdate {
    InsertRows {
        paths: Vec<IndexPath>,
        animation: RowAnimation,
    },
    DeleteRows {
        paths: Vec<IndexPath>,
        animation: RowAnimation,
    },
    InsertSections {
        indices: Vec<usize>,
        animation: RowAnimation,
    },
    DeleteSections {
        indices: Vec<usize>,
        animation: RowAnimation,
    },
}

impl TableUpdate {
    pub fn animation(&self) -> RowAnimation {
        match self {
            TableUpdate::InsertRows { animation, .. }
            | TableUpdate::DeleteRows { animation, .. }
            | TableUpdate::InsertSections { animation, .. }
            | TableUpdate::DeleteSections { animation, .. } => *animation,
        }
    }
}

/// The toolkit table driven by a list.
///
/// Hooks run while the list is locked: implementations record or schedule
/// work and must not query the list from inside them.
pub trait TableHost: Send {
    /// Drop everything displayed and query the data source again.
    fn reload_data(&mut self);

    /// Start an animated batch. The host calls
    /// [`UicList::complete_batch`](crate::UicList::complete_batch) with `batch`
    /// once the animation finishes.
    fn apply(&mut self, update: &TableUpdate, batch: BatchId);

    /// Run an empty batch so row heights are queried again.
    fn refresh_layout(&mut self);

    /// Re-query the given rows without structural change.
    fn reload_rows(&mut self, paths: &[IndexPath], animation: RowAnimation) {
        let _ = (paths, animation);
        self.reload_data();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingHost {
        reloads: usize,
    }

    impl TableHost for CountingHost {
        fn reload_data(&mut self) {
            self.reloads += 1;
        }
        fn apply(&mut self, _: &TableUpdate, _: BatchId) {}
        fn refresh_layout(&mut self) {}
    }

    #[test]
    fn test_batch_ids_are_unique() {
        let a = BatchId::next();
        let b = BatchId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(a.to_string(), format!("#{}", a.as_u64()));
    }

    #[test]
    fn test_reload_rows_defaults_to_full_reload() {
        let mut host = CountingHost::default();
        host.reload_rows(&[IndexPath::new(0, 0)], RowAnimation::Fade);
        assert_eq!(host.reloads, 1);
    }

    #[test]
    fn test_update_animation() {
        let update = TableUpdate::DeleteSections {
            indices: vec![1],
            animation: RowAnimation::Left,
        };
        assert_eq!(update.animation(), RowAnimation::Left);
    }
}
