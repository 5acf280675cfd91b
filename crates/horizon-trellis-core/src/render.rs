//! Render milestones.
//!
//! Every view moves monotonically through [`RenderState::NotRendered`] (it has
//! been given a superview), [`RenderState::Rendered`] (the move completed) and
//! [`RenderState::InTheScene`] (it is attached to a window). Callbacks
//! registered for a milestone are one-shot: each runs exactly once, either when
//! the milestone is committed or, if the view already passed it, on the next
//! main queue turn.
//!
//! The protocol has three entry points:
//!
//! - [`Scene::render_append`] marks a milestone pending and schedules a single
//!   deferred flush when the view already reached it.
//! - [`Scene::render_pop`] delivers every milestone up to the requested one.
//!   Popping a milestone that is not pending is a protocol violation and panics.
//! - [`Scene::render_commit`] raises the committed state and pops the
//!   milestone on the view and on every attached descendant still waiting for
//!   it, leaves before root.

use crate::logging::targets;
use crate::scene::Scene;
use crate::view::ViewId;

/// Ordered render milestones. Comparison is ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RenderState {
    /// The view has not been handed to a superview yet.
    #[default]
    Unset,
    /// The view is about to move into a superview.
    NotRendered,
    /// The view has a superview.
    Rendered,
    /// The view is attached to a window.
    InTheScene,
}

impl RenderState {
    /// The milestones callbacks can wait for, in order.
    pub const MILESTONES: [RenderState; 3] = [
        RenderState::NotRendered,
        RenderState::Rendered,
        RenderState::InTheScene,
    ];

    fn slot(self) -> Option<usize> {
        match self {
            RenderState::Unset => None,
            RenderState::NotRendered => Some(0),
            RenderState::Rendered => Some(1),
            RenderState::InTheScene => Some(2),
        }
    }
}

/// A one-shot render callback.
pub type RenderCallback = Box<dyn FnOnce(&mut Scene, ViewId) + 'static>;

/// Per-view render bookkeeping.
#[derive(Default)]
pub(crate) struct RenderTracker {
    state: RenderState,
    pending: [bool; 3],
    chains: [Vec<RenderCallback>; 3],
    flush_scheduled: bool,
}

impl RenderTracker {
    fn is_pending(&self, milestone: RenderState) -> bool {
        milestone.slot().is_some_and(|slot| self.pending[slot])
    }

    /// Highest pending milestone not above the committed state.
    fn deliverable(&self) -> Option<RenderState> {
        RenderState::MILESTONES
            .into_iter()
            .rev()
            .find(|&m| m <= self.state && self.is_pending(m))
    }
}

impl Scene {
    /// The view's committed render state.
    pub fn render_state(&self, view: ViewId) -> Option<RenderState> {
        self.try_node(view).map(|n| n.render.state)
    }

    /// Whether a milestone is waiting to be delivered on `view`.
    pub fn is_render_pending(&self, view: ViewId, milestone: RenderState) -> bool {
        self.try_node(view)
            .is_some_and(|n| n.render.is_pending(milestone))
    }

    /// Run `callback` once the view is about to get a superview.
    pub fn on_not_rendered<F>(&mut self, view: ViewId, callback: F)
    where
        F: FnOnce(&mut Scene, ViewId) + 'static,
    {
        self.register_render(view, RenderState::NotRendered, Box::new(callback));
    }

    /// Run `callback` once the view has a superview.
    pub fn on_rendered<F>(&mut self, view: ViewId, callback: F)
    where
        F: FnOnce(&mut Scene, ViewId) + 'static,
    {
        self.register_render(view, RenderState::Rendered, Box::new(callback));
    }

    /// Run `callback` once the view is attached to a window.
    pub fn on_in_the_scene<F>(&mut self, view: ViewId, callback: F)
    where
        F: FnOnce(&mut Scene, ViewId) + 'static,
    {
        self.register_render(view, RenderState::InTheScene, Box::new(callback));
    }

    fn register_render(&mut self, view: ViewId, milestone: RenderState, callback: RenderCallback) {
        let Some(node) = self.try_node_mut(view) else {
            return;
        };
        if let Some(slot) = milestone.slot() {
            node.render.chains[slot].push(callback);
        }
        self.render_append(view, milestone);
    }

    /// Mark `milestone` pending.
    ///
    /// If the view already reached it and no flush is outstanding, exactly one
    /// flush is posted to the main queue; it delivers every pending milestone
    /// up to the committed state.
    pub fn render_append(&mut self, view: ViewId, milestone: RenderState) {
        let Some(slot) = milestone.slot() else {
            return;
        };
        let Some(node) = self.try_node_mut(view) else {
            return;
        };
        let tracker = &mut node.render;
        tracker.pending[slot] = true;

        if tracker.state >= milestone && !tracker.flush_scheduled {
            tracker.flush_scheduled = true;
            tracing::trace!(target: targets::RENDER, ?view, ?milestone, "scheduling render flush");
            self.post(move |scene| scene.render_flush(view));
        }
    }

    fn render_flush(&mut self, view: ViewId) {
        let Some(node) = self.try_node_mut(view) else {
            return;
        };
        node.render.flush_scheduled = false;
        if let Some(milestone) = node.render.deliverable() {
            self.render_pop(view, milestone);
        }
    }

    /// Deliver every milestone up to `milestone`.
    ///
    /// Raises the committed state to at least `milestone`, then runs and
    /// discards the callback chain of each milestone at or below it, lowest
    /// first.
    ///
    /// # Panics
    ///
    /// Panics if `milestone` is not pending on `view`.
    pub fn render_pop(&mut self, view: ViewId, milestone: RenderState) {
        let Some(node) = self.try_node_mut(view) else {
            return;
        };
        let tracker = &mut node.render;
        assert!(
            tracker.is_pending(milestone),
            "render milestone {milestone:?} popped on {view:?} without being appended"
        );

        if tracker.state < milestone {
            tracker.state = milestone;
        }
        let mut callbacks = Vec::new();
        for m in RenderState::MILESTONES {
            if m > milestone {
                break;
            }
            if let Some(slot) = m.slot() {
                tracker.pending[slot] = false;
                callbacks.append(&mut tracker.chains[slot]);
            }
        }
        tracing::trace!(
            target: targets::RENDER,
            ?view,
            ?milestone,
            callbacks = callbacks.len(),
            "render milestone delivered"
        );

        for callback in callbacks {
            callback(self, view);
        }
    }

    /// Commit `state` on `view`.
    ///
    /// If the milestone is pending, it is popped on the view and on every
    /// descendant reachable through views that are attached (at least
    /// `NotRendered`) and still waiting for it. Leaves are popped first.
    pub fn render_commit(&mut self, view: ViewId, state: RenderState) {
        let Some(node) = self.try_node_mut(view) else {
            return;
        };
        if node.render.state < state {
            tracing::trace!(target: targets::RENDER, ?view, from = ?node.render.state, to = ?state, "render state raised");
            node.render.state = state;
        }
        if !node.render.is_pending(state) {
            return;
        }

        let mut waiting = vec![view];
        self.collect_render_waiting(view, state, &mut waiting);

        for id in waiting.into_iter().rev() {
            if self.is_render_pending(id, state) {
                self.render_pop(id, state);
            }
        }
    }

    fn collect_render_waiting(&self, view: ViewId, state: RenderState, result: &mut Vec<ViewId>) {
        let Some(node) = self.try_node(view) else {
            return;
        };
        for &child in &node.children {
            let Some(child_node) = self.try_node(child) else {
                continue;
            };
            if child_node.render.is_pending(state)
                && child_node.render.state >= RenderState::NotRendered
            {
                result.push(child);
                self.collect_render_waiting(child, state, result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::view::ViewKind;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_state_ordering() {
        assert!(RenderState::Unset < RenderState::NotRendered);
        assert!(RenderState::NotRendered < RenderState::Rendered);
        assert!(RenderState::Rendered < RenderState::InTheScene);
    }

    #[test]
    fn test_pop_delivers_lower_milestones_once() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);
        let calls = recorder();

        let c = calls.clone();
        scene.on_not_rendered(view, move |_, _| c.lock().push("not-rendered"));
        let c = calls.clone();
        scene.on_in_the_scene(view, move |_, _| c.lock().push("in-the-scene"));

        scene.render_pop(view, RenderState::InTheScene);
        assert_eq!(*calls.lock(), vec!["not-rendered", "in-the-scene"]);
        assert_eq!(scene.render_state(view), Some(RenderState::InTheScene));

        scene.render_append(view, RenderState::Rendered);
        scene.render_pop(view, RenderState::Rendered);
        assert_eq!(calls.lock().len(), 2);
        // Popping never lowers the committed state.
        assert_eq!(scene.render_state(view), Some(RenderState::InTheScene));
    }

    #[test]
    #[should_panic(expected = "without being appended")]
    fn test_pop_without_append_panics() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);
        scene.render_pop(view, RenderState::Rendered);
    }

    #[test]
    fn test_commit_is_idempotent() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);
        let calls = recorder();

        let c = calls.clone();
        scene.on_rendered(view, move |_, _| c.lock().push("rendered"));

        scene.render_commit(view, RenderState::Rendered);
        scene.render_commit(view, RenderState::Rendered);

        assert_eq!(*calls.lock(), vec!["rendered"]);
    }

    #[test]
    fn test_late_registration_flushes_on_next_turn() {
        let mut scene = Scene::new();
        let window = scene.create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        let view = scene.create_view(ViewKind::Native);
        scene.add_subview(window, view).unwrap();
        let calls = recorder();

        let c = calls.clone();
        scene.on_rendered(view, move |_, _| c.lock().push("rendered"));
        let c = calls.clone();
        scene.on_in_the_scene(view, move |_, _| c.lock().push("in-the-scene"));

        assert!(calls.lock().is_empty());
        assert_eq!(scene.queue().pending_count(), 1);

        scene.run_pending();
        assert_eq!(*calls.lock(), vec!["rendered", "in-the-scene"]);
        assert!(!scene.has_pending_tasks());
    }

    #[test]
    fn test_commit_pops_descendants_leaves_first() {
        let mut scene = Scene::new();
        let root = scene.create_view(ViewKind::Native);
        let child = scene.create_view(ViewKind::Native);
        let grandchild = scene.create_view(ViewKind::Composite);
        scene.add_subview(root, child).unwrap();
        scene.add_subview(child, grandchild).unwrap();
        let calls = recorder();

        for (view, label) in [(root, "root"), (child, "child"), (grandchild, "grandchild")] {
            let c = calls.clone();
            scene.on_in_the_scene(view, move |_, _| c.lock().push(label));
        }

        scene.render_commit(root, RenderState::InTheScene);
        assert_eq!(*calls.lock(), vec!["grandchild", "child", "root"]);
    }

    #[test]
    fn test_commit_stops_at_descendants_not_waiting() {
        let mut scene = Scene::new();
        let root = scene.create_view(ViewKind::Native);
        let child = scene.create_view(ViewKind::Native);
        let grandchild = scene.create_view(ViewKind::Native);
        scene.add_subview(root, child).unwrap();
        scene.add_subview(child, grandchild).unwrap();
        let calls = recorder();

        let c = calls.clone();
        scene.on_in_the_scene(root, move |_, _| c.lock().push("root"));
        let c = calls.clone();
        scene.on_in_the_scene(grandchild, move |_, _| c.lock().push("grandchild"));

        scene.render_commit(root, RenderState::InTheScene);
        assert_eq!(*calls.lock(), vec!["root"]);
        assert!(scene.is_render_pending(grandchild, RenderState::InTheScene));

        scene.render_commit(grandchild, RenderState::InTheScene);
        assert_eq!(*calls.lock(), vec!["root", "grandchild"]);
    }

    #[test]
    fn test_lower_commit_keeps_higher_milestone_pending() {
        let mut scene = Scene::new();
        let root = scene.create_view(ViewKind::Native);
        let calls = recorder();

        let c = calls.clone();
        scene.on_in_the_scene(root, move |_, _| c.lock().push("first"));
        let c = calls.clone();
        scene.on_in_the_scene(root, move |_, _| c.lock().push("second"));

        scene.render_commit(root, RenderState::Rendered);
        assert!(calls.lock().is_empty());

        scene.render_commit(root, RenderState::InTheScene);
        assert_eq!(*calls.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_flush_for_destroyed_view_is_noop() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);
        scene.render_commit(view, RenderState::Rendered);
        let calls = recorder();

        let c = calls.clone();
        scene.on_rendered(view, move |_, _| c.lock().push("rendered"));
        scene.destroy_view(view).unwrap();

        assert_eq!(scene.run_pending(), 1);
        assert!(calls.lock().is_empty());
    }
}
