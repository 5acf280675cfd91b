//! The view arena.
//!
//! [`Scene`] owns every view, its tracker state and its out-of-band payloads,
//! plus the [`MainQueue`] that deferred lifecycle work is posted to. Structural
//! edits (adding, removing, destroying views, resizing, hiding) invoke the
//! [`RenderManager`] hooks in the order a native toolkit would, which in turn
//! drive the render, appear, layout and trait trackers.
//!
//! # Example
//!
//! ```
//! use horizon_trellis_core::{AppearState, Rect, RenderState, Scene, ViewKind};
//!
//! let mut scene = Scene::new();
//! let window = scene.create_window(Rect::new(0.0, 0.0, 320.0, 480.0));
//! let label = scene.create_view(ViewKind::Native);
//! scene.set_frame(label, Rect::new(0.0, 0.0, 100.0, 20.0)).unwrap();
//!
//! scene.add_subview(window, label).unwrap();
//!
//! assert_eq!(scene.render_state(label), Some(RenderState::InTheScene));
//! assert_eq!(scene.appear_state(label), Some(AppearState::Appeared));
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use slotmap::SlotMap;

use crate::error::{Result, SceneError};
use crate::geometry::Rect;
use crate::logging::targets;
use crate::manager::RenderManager;
use crate::queue::{MainQueue, TaskId};
use crate::thread_check::ThreadAffinity;
use crate::view::{ViewId, ViewKind, ViewNode};

/// Upper bound on turns processed by [`Scene::run_until_idle`].
const MAX_IDLE_TURNS: usize = 1024;

/// Arena of views plus the main queue.
///
/// A scene is bound to the thread that created it.
pub struct Scene {
    views: SlotMap<ViewId, ViewNode>,
    queue: MainQueue,
    affinity: ThreadAffinity,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene bound to the current thread.
    pub fn new() -> Self {
        Self {
            views: SlotMap::with_key(),
            queue: MainQueue::new(),
            affinity: ThreadAffinity::current(),
        }
    }

    /// The thread this scene belongs to.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    // =========================================================================
    // Creation / Destruction
    // =========================================================================

    /// Create a window with the given frame.
    ///
    /// A window is its own window, so it reaches [`RenderState::InTheScene`]
    /// immediately and appears if its frame is non-empty.
    ///
    /// [`RenderState::InTheScene`]: crate::RenderState::InTheScene
    pub fn create_window(&mut self, frame: Rect) -> ViewId {
        let mut node = ViewNode::new(ViewKind::Window);
        node.frame = frame;
        let id = self.views.insert(node);
        tracing::trace!(target: targets::SCENE, ?id, "created window");
        self.did_move_to_window(id);
        id
    }

    /// Create a detached view.
    ///
    /// Passing [`ViewKind::Window`] is equivalent to
    /// `create_window(Rect::ZERO)`.
    pub fn create_view(&mut self, kind: ViewKind) -> ViewId {
        if kind == ViewKind::Window {
            return self.create_window(Rect::ZERO);
        }
        let id = self.views.insert(ViewNode::new(kind));
        tracing::trace!(target: targets::SCENE, ?id, ?kind, "created view");
        id
    }

    /// Create a detached view with a debug name.
    pub fn create_named_view(&mut self, kind: ViewKind, name: impl Into<String>) -> ViewId {
        let id = self.create_view(kind);
        if let Some(node) = self.views.get_mut(id) {
            node.name = name.into();
        }
        id
    }

    /// Destroy a view and its whole subtree.
    ///
    /// An attached view is first removed from its superview, so its subtree
    /// receives the usual detach hooks. Payloads and registered callbacks are
    /// dropped with the views; deferred work targeting them becomes a no-op.
    pub fn destroy_view(&mut self, view: ViewId) -> Result<()> {
        self.affinity.debug_assert_same_thread_with_msg("Scene::destroy_view");
        if self.superview(view)?.is_some() {
            self.remove_from_superview(view)?;
        }
        // A detach handler may already have destroyed the view.
        if !self.contains(view) {
            return Ok(());
        }

        let doomed = self.collect_descendants(view)?;
        tracing::trace!(
            target: targets::SCENE,
            ?view,
            descendant_count = doomed.len(),
            "destroying view tree"
        );
        for id in doomed {
            self.views.remove(id);
        }
        self.views.remove(view);
        Ok(())
    }

    /// Children first, depth-first.
    fn collect_descendants(&self, view: ViewId) -> Result<Vec<ViewId>> {
        let mut result = Vec::new();
        self.collect_descendants_recursive(view, &mut result)?;
        Ok(result)
    }

    fn collect_descendants_recursive(&self, view: ViewId, result: &mut Vec<ViewId>) -> Result<()> {
        let node = self.node(view)?;
        for &child in &node.children {
            self.collect_descendants_recursive(child, result)?;
            result.push(child);
        }
        Ok(())
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Append `child` to `parent`'s subviews.
    ///
    /// A child that already has a superview is moved. Hooks fire in toolkit
    /// order: will-move-to-superview, did-move-to-superview, then
    /// did-move-to-window on every view of the moved subtree if its window
    /// changed.
    pub fn add_subview(&mut self, parent: ViewId, child: ViewId) -> Result<()> {
        let index = self.node(parent)?.children.len();
        self.insert_subview(parent, child, index)
    }

    /// Insert `child` into `parent`'s subviews at `index` (clamped).
    pub fn insert_subview(&mut self, parent: ViewId, child: ViewId, index: usize) -> Result<()> {
        self.affinity.debug_assert_same_thread_with_msg("Scene::insert_subview");
        self.node(parent)?;
        if self.node(child)?.kind == ViewKind::Window {
            return Err(SceneError::WindowAsSubview(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::CircularParentage { parent, child });
        }

        let old_window = self.window(child)?;
        let old_traits = self.effective_traits_snapshot(child)?;

        self.will_move_to_superview(child, Some(parent));
        // Hooks may run arbitrary callbacks; re-validate before linking.
        self.node(parent)?;
        self.node(child)?;

        self.unlink(child);
        if let Some(node) = self.views.get_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
        if let Some(node) = self.views.get_mut(child) {
            node.parent = Some(parent);
        }
        tracing::trace!(target: targets::SCENE, ?parent, ?child, "added subview");

        self.did_move_to_superview(child);

        if self.contains(child) && self.window(child)? != old_window {
            self.propagate_window_change(child)?;
        }
        self.notify_trait_changes(old_traits);
        Ok(())
    }

    /// Detach `view` from its superview. Detached views are left untouched.
    pub fn remove_from_superview(&mut self, view: ViewId) -> Result<()> {
        self.affinity.debug_assert_same_thread_with_msg("Scene::remove_from_superview");
        let Some(parent) = self.node(view)?.parent else {
            return Ok(());
        };
        let old_window = self.window(view)?;
        let old_traits = self.effective_traits_snapshot(view)?;

        self.will_move_to_superview(view, None);
        if !self.contains(view) {
            return Ok(());
        }
        self.unlink(view);
        tracing::trace!(target: targets::SCENE, ?parent, ?view, "removed from superview");

        self.did_move_to_superview(view);

        if self.contains(view) && old_window.is_some() {
            self.propagate_window_change(view)?;
        }
        self.notify_trait_changes(old_traits);
        Ok(())
    }

    fn unlink(&mut self, view: ViewId) {
        let old_parent = self.views.get(view).and_then(|n| n.parent);
        if let Some(old_parent) = old_parent {
            if let Some(parent_node) = self.views.get_mut(old_parent) {
                parent_node.children.retain(|&c| c != view);
            }
        }
        if let Some(node) = self.views.get_mut(view) {
            node.parent = None;
        }
    }

    fn propagate_window_change(&mut self, root: ViewId) -> Result<()> {
        for id in self.depth_first_preorder(root)? {
            if self.contains(id) {
                self.did_move_to_window(id);
            }
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: ViewId, view: ViewId) -> bool {
        let mut current = Some(view);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.views.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Whether `view` lies in `ancestor`'s subtree (or is `ancestor`).
    pub fn is_descendant_of(&self, view: ViewId, ancestor: ViewId) -> bool {
        self.contains(view) && self.is_ancestor_or_self(ancestor, view)
    }

    /// Check whether a view exists.
    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains_key(view)
    }

    /// Number of live views.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// The kind a view was created with.
    pub fn kind(&self, view: ViewId) -> Result<ViewKind> {
        Ok(self.node(view)?.kind)
    }

    /// Debug name of a view (empty if unnamed).
    pub fn name(&self, view: ViewId) -> Result<&str> {
        Ok(&self.node(view)?.name)
    }

    /// Set the debug name of a view.
    pub fn set_name(&mut self, view: ViewId, name: impl Into<String>) -> Result<()> {
        self.node_mut(view)?.name = name.into();
        Ok(())
    }

    /// The view's superview.
    pub fn superview(&self, view: ViewId) -> Result<Option<ViewId>> {
        Ok(self.node(view)?.parent)
    }

    /// The view's subviews, back to front.
    pub fn subviews(&self, view: ViewId) -> Result<&[ViewId]> {
        Ok(&self.node(view)?.children)
    }

    /// The window the view is attached to, if any.
    ///
    /// A window is its own window.
    pub fn window(&self, view: ViewId) -> Result<Option<ViewId>> {
        let mut current = view;
        loop {
            let node = self.node(current)?;
            match node.parent {
                Some(parent) => current = parent,
                None => {
                    return Ok((node.kind == ViewKind::Window).then_some(current));
                }
            }
        }
    }

    /// All ancestors from the immediate superview to the root.
    pub fn ancestors(&self, view: ViewId) -> Result<Vec<ViewId>> {
        let mut result = Vec::new();
        let mut current = self.node(view)?.parent;
        while let Some(id) = current {
            result.push(id);
            current = self.views.get(id).and_then(|n| n.parent);
        }
        Ok(result)
    }

    /// The view followed by its descendants, parents before children.
    pub fn depth_first_preorder(&self, view: ViewId) -> Result<Vec<ViewId>> {
        let mut result = Vec::new();
        self.preorder_recursive(view, &mut result)?;
        Ok(result)
    }

    fn preorder_recursive(&self, view: ViewId, result: &mut Vec<ViewId>) -> Result<()> {
        let node = self.node(view)?;
        result.push(view);
        for &child in &node.children {
            self.preorder_recursive(child, result)?;
        }
        Ok(())
    }

    /// Root views (windows and detached trees).
    pub fn root_views(&self) -> Vec<ViewId> {
        self.views
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    // =========================================================================
    // Geometry / Visibility
    // =========================================================================

    /// The view's frame.
    pub fn frame(&self, view: ViewId) -> Result<Rect> {
        Ok(self.node(view)?.frame)
    }

    /// Change the view's frame. Fires the frame-changed hook when it differs.
    pub fn set_frame(&mut self, view: ViewId, frame: Rect) -> Result<()> {
        let node = self.node_mut(view)?;
        if node.frame == frame {
            return Ok(());
        }
        node.frame = frame;
        self.frame_did_change(view);
        Ok(())
    }

    /// Whether the view itself is hidden.
    pub fn is_hidden(&self, view: ViewId) -> Result<bool> {
        Ok(self.node(view)?.hidden)
    }

    /// Hide or show the view. Fires the hidden-changed hook when it differs.
    pub fn set_hidden(&mut self, view: ViewId, hidden: bool) -> Result<()> {
        let node = self.node_mut(view)?;
        if node.hidden == hidden {
            return Ok(());
        }
        node.hidden = hidden;
        self.hidden_did_change(view);
        Ok(())
    }

    /// Run a layout pass over `root`'s subtree, parents before children.
    pub fn layout(&mut self, root: ViewId) -> Result<()> {
        self.affinity.debug_assert_same_thread_with_msg("Scene::layout");
        for id in self.depth_first_preorder(root)? {
            if self.contains(id) {
                self.layout_subviews(id);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Payloads
    // =========================================================================

    /// Attach a payload of type `T` to a view, replacing any previous one.
    ///
    /// Payloads are owned by the arena and dropped with the view.
    pub fn set_payload<T: Any>(&mut self, view: ViewId, payload: T) -> Result<Option<T>> {
        let previous = self
            .node_mut(view)?
            .payloads
            .insert(TypeId::of::<T>(), Box::new(payload));
        Ok(previous.and_then(|p| p.downcast::<T>().ok()).map(|p| *p))
    }

    /// Borrow the payload of type `T`.
    pub fn payload<T: Any>(&self, view: ViewId) -> Option<&T> {
        self.views
            .get(view)?
            .payloads
            .get(&TypeId::of::<T>())?
            .downcast_ref::<T>()
    }

    /// Mutably borrow the payload of type `T`.
    pub fn payload_mut<T: Any>(&mut self, view: ViewId) -> Option<&mut T> {
        self.views
            .get_mut(view)?
            .payloads
            .get_mut(&TypeId::of::<T>())?
            .downcast_mut::<T>()
    }

    /// Detach and return the payload of type `T`.
    pub fn take_payload<T: Any>(&mut self, view: ViewId) -> Option<T> {
        let boxed = self
            .views
            .get_mut(view)?
            .payloads
            .remove(&TypeId::of::<T>())?;
        boxed.downcast::<T>().ok().map(|p| *p)
    }

    /// The nearest view, starting at `view` itself, carrying a `T` payload.
    pub fn find_ancestor_with_payload<T: Any>(&self, view: ViewId) -> Option<ViewId> {
        let mut current = Some(view);
        while let Some(id) = current {
            let node = self.views.get(id)?;
            if node.payloads.contains_key(&TypeId::of::<T>()) {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    // =========================================================================
    // Main queue
    // =========================================================================

    /// Post work to run on a later turn.
    pub fn post<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce(&mut Scene) + 'static,
    {
        let id = self.queue.post(task);
        tracing::trace!(target: targets::QUEUE, task = id.as_u64(), "posted task");
        id
    }

    /// The main queue.
    pub fn queue(&self) -> &MainQueue {
        &self.queue
    }

    /// Whether deferred work is waiting.
    pub fn has_pending_tasks(&self) -> bool {
        self.queue.has_pending()
    }

    /// Run one turn: every task posted before this call, in order.
    ///
    /// Tasks posted while the turn runs wait for the next turn. Returns the
    /// number of tasks run.
    pub fn run_pending(&mut self) -> usize {
        self.affinity.debug_assert_same_thread_with_msg("Scene::run_pending");
        let tasks = self.queue.take_turn();
        let count = tasks.len();
        if count > 0 {
            tracing::trace!(target: targets::QUEUE, count, "running main queue turn");
        }
        for task in tasks {
            task(self);
        }
        count
    }

    /// Run turns until the queue is empty. Returns the number of tasks run.
    pub fn run_until_idle(&mut self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_IDLE_TURNS {
            if !self.queue.has_pending() {
                return total;
            }
            total += self.run_pending();
        }
        tracing::warn!(
            target: targets::QUEUE,
            pending = self.queue.pending_count(),
            "main queue still busy after {MAX_IDLE_TURNS} turns"
        );
        total
    }

    // =========================================================================
    // Internal access
    // =========================================================================

    pub(crate) fn node(&self, view: ViewId) -> Result<&ViewNode> {
        self.views.get(view).ok_or(SceneError::InvalidView(view))
    }

    pub(crate) fn node_mut(&mut self, view: ViewId) -> Result<&mut ViewNode> {
        self.views
            .get_mut(view)
            .ok_or(SceneError::InvalidView(view))
    }

    pub(crate) fn try_node(&self, view: ViewId) -> Option<&ViewNode> {
        self.views.get(view)
    }

    pub(crate) fn try_node_mut(&mut self, view: ViewId) -> Option<&mut ViewNode> {
        self.views.get_mut(view)
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("views", &self.views.len())
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn scene_with_window() -> (Scene, ViewId) {
        let mut scene = Scene::new();
        let window = scene.create_window(Rect::new(0.0, 0.0, 100.0, 100.0));
        (scene, window)
    }

    #[test]
    fn test_add_and_remove_subview() {
        let (mut scene, window) = scene_with_window();
        let a = scene.create_view(ViewKind::Native);
        let b = scene.create_view(ViewKind::Native);

        scene.add_subview(window, a).unwrap();
        scene.insert_subview(window, b, 0).unwrap();

        assert_eq!(scene.subviews(window).unwrap(), &[b, a]);
        assert_eq!(scene.superview(a).unwrap(), Some(window));
        assert_eq!(scene.window(a).unwrap(), Some(window));

        scene.remove_from_superview(a).unwrap();
        assert_eq!(scene.subviews(window).unwrap(), &[b]);
        assert_eq!(scene.window(a).unwrap(), None);
    }

    #[test]
    fn test_moving_between_parents() {
        let (mut scene, window) = scene_with_window();
        let first = scene.create_view(ViewKind::Native);
        let second = scene.create_view(ViewKind::Native);
        let child = scene.create_view(ViewKind::Composite);
        scene.add_subview(window, first).unwrap();
        scene.add_subview(window, second).unwrap();

        scene.add_subview(first, child).unwrap();
        scene.add_subview(second, child).unwrap();

        assert!(scene.subviews(first).unwrap().is_empty());
        assert_eq!(scene.subviews(second).unwrap(), &[child]);
    }

    #[test]
    fn test_circular_parentage_rejected() {
        let mut scene = Scene::new();
        let a = scene.create_view(ViewKind::Native);
        let b = scene.create_view(ViewKind::Native);
        scene.add_subview(a, b).unwrap();

        assert_eq!(
            scene.add_subview(b, a),
            Err(SceneError::CircularParentage { parent: b, child: a })
        );
        assert_eq!(
            scene.add_subview(a, a),
            Err(SceneError::CircularParentage { parent: a, child: a })
        );
    }

    #[test]
    fn test_window_cannot_be_subview() {
        let (mut scene, window) = scene_with_window();
        let view = scene.create_view(ViewKind::Native);

        assert_eq!(
            scene.add_subview(view, window),
            Err(SceneError::WindowAsSubview(window))
        );
        assert_eq!(scene.window(window).unwrap(), Some(window));
    }

    #[test]
    fn test_destroy_cascades() {
        let (mut scene, window) = scene_with_window();
        let parent = scene.create_view(ViewKind::Native);
        let child = scene.create_view(ViewKind::Composite);
        let grandchild = scene.create_view(ViewKind::Native);
        scene.add_subview(window, parent).unwrap();
        scene.add_subview(parent, child).unwrap();
        scene.add_subview(child, grandchild).unwrap();

        scene.destroy_view(parent).unwrap();

        assert!(!scene.contains(parent));
        assert!(!scene.contains(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.subviews(window).unwrap().is_empty());
        assert_eq!(scene.view_count(), 1);
        assert_eq!(scene.frame(child), Err(SceneError::InvalidView(child)));
    }

    #[test]
    fn test_payloads_dropped_with_view() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);
        let marker = std::sync::Arc::new(());

        assert!(scene.set_payload(view, marker.clone()).unwrap().is_none());
        assert_eq!(std::sync::Arc::strong_count(&marker), 2);
        assert!(scene.payload::<std::sync::Arc<()>>(view).is_some());

        scene.destroy_view(view).unwrap();
        assert_eq!(std::sync::Arc::strong_count(&marker), 1);
        assert!(scene.payload::<std::sync::Arc<()>>(view).is_none());
    }

    #[test]
    fn test_payload_replace_and_take() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);

        scene.set_payload(view, 1u32).unwrap();
        assert_eq!(scene.set_payload(view, 2u32).unwrap(), Some(1));
        *scene.payload_mut::<u32>(view).unwrap() += 1;
        assert_eq!(scene.take_payload::<u32>(view), Some(3));
        assert_eq!(scene.take_payload::<u32>(view), None);
    }

    #[test]
    fn test_find_ancestor_with_payload() {
        let mut scene = Scene::new();
        let table = scene.create_view(ViewKind::Native);
        let cell = scene.create_view(ViewKind::Native);
        let content = scene.create_view(ViewKind::Composite);
        scene.add_subview(table, cell).unwrap();
        scene.add_subview(cell, content).unwrap();
        scene.set_payload(table, "table").unwrap();

        assert_eq!(scene.find_ancestor_with_payload::<&str>(content), Some(table));
        assert_eq!(scene.find_ancestor_with_payload::<u8>(content), None);
    }

    #[test]
    fn test_run_pending_processes_one_turn() {
        let mut scene = Scene::new();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        let order_clone = order.clone();
        scene.post(move |scene| {
            order_clone.borrow_mut().push(1);
            let order_inner = order_clone.clone();
            scene.post(move |_| order_inner.borrow_mut().push(2));
        });

        assert_eq!(scene.run_pending(), 1);
        assert_eq!(*order.borrow(), vec![1]);
        assert!(scene.has_pending_tasks());

        assert_eq!(scene.run_until_idle(), 1);
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_ancestors_and_preorder() {
        let (mut scene, window) = scene_with_window();
        let a = scene.create_view(ViewKind::Native);
        let b = scene.create_view(ViewKind::Native);
        let c = scene.create_view(ViewKind::Native);
        scene.add_subview(window, a).unwrap();
        scene.add_subview(a, b).unwrap();
        scene.add_subview(window, c).unwrap();

        assert_eq!(scene.ancestors(b).unwrap(), vec![a, window]);
        assert_eq!(scene.depth_first_preorder(window).unwrap(), vec![window, a, b, c]);
        assert!(scene.is_descendant_of(b, window));
        assert!(!scene.is_descendant_of(window, b));
        assert_eq!(scene.root_views(), vec![window]);
    }
}
