//! Reusable cells hosting declared row content.
//!
//! A [`ReusableCell`] owns a native container view. Preparing it for a row
//! throws away whatever the container hosted before, instantiates the row's
//! content, pins it to the container according to a [`CellAxis`] and wires
//! self-sizing feedback so measured heights reach the table.

use std::sync::Arc;

use horizon_trellis_core::{Rect, Scene, Size, ViewId, ViewKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{IndexPath, PathDelta, Row};
use crate::options::CellStyle;
use crate::sizing::{self, SizingTag};
use crate::targets;

/// How hosted content is aligned inside its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellAxis {
    /// Centered on both axes at its own size.
    Center,
    /// Stretched across the width, centered vertically.
    #[default]
    Horizontal,
    /// Stretched across the height, centered horizontally.
    Vertical,
}

/// Edge or center line of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Leading,
    Trailing,
    Top,
    Bottom,
    CenterX,
    CenterY,
}

/// `item`'s `anchor` equals the same anchor of `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub item: ViewId,
    pub anchor: Anchor,
    pub to: ViewId,
}

/// What kind of entry a cell hosts, for sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SizeKind {
    Header,
    Footer,
    Row,
}

impl CellAxis {
    fn anchors(self) -> &'static [Anchor] {
        match self {
            CellAxis::Horizontal => &[Anchor::Leading, Anchor::Trailing, Anchor::CenterY],
            CellAxis::Vertical => &[Anchor::Top, Anchor::Bottom, Anchor::CenterX],
            CellAxis::Center => &[Anchor::CenterX, Anchor::CenterY],
        }
    }
}

/// Where hosted content reports its height. Empty while the cell is off
/// screen.
type SizingSlot = Arc<Mutex<Option<(SizeKind, IndexPath)>>>;

/// A native cell whose content is rebuilt for every row it shows.
#[derive(Debug)]
pub struct ReusableCell {
    container: ViewId,
    row: Option<Row>,
    hosted: Option<ViewId>,
    axis: CellAxis,
    constraints: Vec<Constraint>,
    sizing: SizingSlot,
}

impl ReusableCell {
    /// Create an empty cell with a fresh container view.
    pub fn new(scene: &mut Scene, style: CellStyle) -> Self {
        let container = scene.create_named_view(ViewKind::Native, style.container_name());
        Self {
            container,
            row: None,
            hosted: None,
            axis: CellAxis::default(),
            constraints: Vec::new(),
            sizing: Arc::new(Mutex::new(None)),
        }
    }

    pub fn container(&self) -> ViewId {
        self.container
    }

    pub fn row(&self) -> Option<&Row> {
        self.row.as_ref()
    }

    /// The view built from the current row's content.
    pub fn hosted(&self) -> Option<ViewId> {
        self.hosted
    }

    pub fn axis(&self) -> CellAxis {
        self.axis
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The cache key measured heights are currently reported under.
    pub fn sizing_key(&self) -> Option<(SizeKind, IndexPath)> {
        *self.sizing.lock()
    }

    /// Follow the shown row through a structural change.
    pub(crate) fn retarget(&self, delta: &PathDelta) {
        let mut slot = self.sizing.lock();
        let current = *slot;
        if let Some((kind, path)) = current {
            *slot = delta.map(kind, path).map(|moved| (kind, moved));
        }
    }

    /// Stop reporting heights until the cell is prepared again.
    pub(crate) fn disarm(&self) {
        *self.sizing.lock() = None;
    }

    /// Show `row` in this cell. The content is always rebuilt.
    pub fn prepare(&mut self, scene: &mut Scene, row: Row, axis: CellAxis) -> Result<ViewId> {
        self.axis = axis;
        self.row = Some(row.clone());
        self.host_row(scene, &row)
    }

    /// Replace the container's subviews with freshly built content of the
    /// current row. An empty cell is just cleared.
    pub fn add_view(&mut self, scene: &mut Scene) -> Result<Option<ViewId>> {
        match self.row.clone() {
            Some(row) => self.host_row(scene, &row).map(Some),
            None => {
                self.clear(scene)?;
                Ok(None)
            }
        }
    }

    fn clear(&mut self, scene: &mut Scene) -> Result<()> {
        for stale in scene.subviews(self.container)?.to_vec() {
            scene.destroy_view(stale)?;
        }
        self.hosted = None;
        self.constraints.clear();
        Ok(())
    }

    fn host_row(&mut self, scene: &mut Scene, row: &Row) -> Result<ViewId> {
        self.clear(scene)?;

        let hosted = row.build_content(scene);
        scene.add_subview(self.container, hosted)?;
        self.hosted = Some(hosted);
        self.constraints = self
            .axis
            .anchors()
            .iter()
            .map(|&anchor| Constraint {
                item: hosted,
                anchor,
                to: self.container,
            })
            .collect();

        tracing::trace!(
            target: targets::CELL,
            container = ?self.container,
            ?hosted,
            axis = ?self.axis,
            "hosted row content"
        );

        *self.sizing.lock() = Some(row.sizing_key());
        observe_size(scene, hosted, self.axis, self.sizing.clone());
        Ok(hosted)
    }

    /// Position the hosted view inside the container per the constraints.
    ///
    /// Pinned anchors take the container's extent on that axis; the other
    /// axis keeps the hosted view's own size and is centered.
    pub fn apply_constraints(&self, scene: &mut Scene) -> Result<()> {
        let Some(hosted) = self.hosted else {
            return Ok(());
        };
        let bounds = scene.frame(self.container)?;
        let own = scene.frame(hosted)?;
        let mut frame = Rect::from_size(own.size);

        for constraint in &self.constraints {
            match constraint.anchor {
                Anchor::Leading | Anchor::Trailing => frame.size.width = bounds.width(),
                Anchor::Top | Anchor::Bottom => frame.size.height = bounds.height(),
                Anchor::CenterX => frame.origin.x = (bounds.width() - frame.width()) / 2.0,
                Anchor::CenterY => frame.origin.y = (bounds.height() - frame.height()) / 2.0,
            }
        }

        scene.set_frame(hosted, frame)?;
        Ok(())
    }
}

/// Report the hosted view's height to its table whenever a layout pass
/// changes its size or the row it shows moved. The view is tagged on the
/// first report and re-tagged when it moves.
fn observe_size(scene: &mut Scene, hosted: ViewId, axis: CellAxis, slot: SizingSlot) {
    let mut last: Option<Size> = None;
    let mut tagged: Option<(SizeKind, IndexPath)> = None;

    scene.on_layout(hosted, move |scene, view| {
        let Some((kind, index_path)) = *slot.lock() else {
            return;
        };
        let Ok(frame) = scene.frame(view) else {
            return;
        };
        let key = Some((kind, index_path));
        if last == Some(frame.size) && tagged == key {
            return;
        }
        if tagged != key {
            let tag = SizingTag {
                axis,
                kind,
                index_path,
            };
            let _ = scene.set_payload(view, tag);
            tagged = key;
        }
        last = Some(frame.size);
        sizing::report_height(scene, view, kind, index_path, frame.height());
    });
}
