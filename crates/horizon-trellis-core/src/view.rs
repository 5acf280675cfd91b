//! View handles and per-view arena records.
//!
//! Views live in the [`Scene`](crate::Scene) arena and are addressed by
//! [`ViewId`]. A `ViewId` is a weak handle: once the view is destroyed every
//! lookup through it fails (or is silently skipped by deferred work), so
//! callbacks and queued tasks never keep a view alive.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use slotmap::new_key_type;

use crate::appear::AppearTracker;
use crate::geometry::Rect;
use crate::layout::LayoutTracker;
use crate::render::RenderTracker;
use crate::traits::{TraitCollection, TraitTracker};

new_key_type! {
    /// A stable handle to a view in a [`Scene`](crate::Scene).
    ///
    /// Handles stay valid while the view tree is rearranged and become invalid
    /// once the view is destroyed.
    pub struct ViewId;
}

impl ViewId {
    /// Convert the handle to a raw u64, e.g. to hand it to a native toolkit.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Rebuild a handle from [`as_raw`](Self::as_raw).
    ///
    /// The handle is not checked against any scene.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// How a view takes part in the lifecycle protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// A root view. A window is its own window and can never be a subview.
    Window,
    /// A toolkit-integrated view that receives lifecycle hooks itself and
    /// propagates appear, layout and trait events to its composite subtree.
    Native,
    /// A template view assembled from other views. Its appear, layout and
    /// trait callbacks are delivered by the nearest native ancestor.
    Composite,
}

impl ViewKind {
    /// Whether the view receives appear, layout and trait commits directly.
    #[inline]
    pub fn is_self_implemented(self) -> bool {
        !matches!(self, ViewKind::Composite)
    }
}

/// Arena record for one view.
pub(crate) struct ViewNode {
    pub(crate) name: String,
    pub(crate) kind: ViewKind,
    pub(crate) parent: Option<ViewId>,
    pub(crate) children: Vec<ViewId>,
    pub(crate) frame: Rect,
    pub(crate) hidden: bool,
    /// Explicit trait override. `None` inherits from the superview.
    pub(crate) traits: Option<TraitCollection>,
    pub(crate) payloads: HashMap<TypeId, Box<dyn Any>>,
    pub(crate) render: RenderTracker,
    pub(crate) appear: AppearTracker,
    pub(crate) layout: LayoutTracker,
    pub(crate) trait_tracker: TraitTracker,
}

impl ViewNode {
    pub(crate) fn new(kind: ViewKind) -> Self {
        Self {
            name: String::new(),
            kind,
            parent: None,
            children: Vec::new(),
            frame: Rect::ZERO,
            hidden: false,
            traits: None,
            payloads: HashMap::new(),
            render: RenderTracker::default(),
            appear: AppearTracker::default(),
            layout: LayoutTracker::default(),
            trait_tracker: TraitTracker::default(),
        }
    }
}
