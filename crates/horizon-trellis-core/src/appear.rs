//! Appear / disappear tracking.
//!
//! Unlike render milestones, appearance toggles: a view may appear, disappear
//! and appear again, and every transition re-delivers the matching handlers.
//! Handlers are persistent. Commits only happen on self-implemented views; each
//! one also delivers to the composite views beneath it, stopping at the next
//! self-implemented view, which is notified by its own hooks.

use crate::logging::targets;
use crate::scene::Scene;
use crate::view::ViewId;

/// Last delivered appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppearState {
    /// Nothing delivered yet.
    #[default]
    Unset,
    /// The view is on screen.
    Appeared,
    /// The view left the screen.
    Disappeared,
}

/// A persistent per-view handler.
pub type ViewCallback = Box<dyn FnMut(&mut Scene, ViewId) + 'static>;

#[derive(Default)]
pub(crate) struct AppearTracker {
    state: AppearState,
    on_appear: Vec<ViewCallback>,
    on_disappear: Vec<ViewCallback>,
}

impl AppearTracker {
    fn needs(&self, state: AppearState) -> bool {
        self.state != state
    }

    fn handlers(&mut self, state: AppearState) -> Option<&mut Vec<ViewCallback>> {
        match state {
            AppearState::Appeared => Some(&mut self.on_appear),
            AppearState::Disappeared => Some(&mut self.on_disappear),
            AppearState::Unset => None,
        }
    }
}

/// Collect the composite subtree under `view`, parents before children,
/// never entering a self-implemented view. `filter` decides which views are
/// kept; traversal continues through composites either way.
pub(crate) fn collect_composite_subtree<F>(
    scene: &Scene,
    view: ViewId,
    filter: &F,
    result: &mut Vec<ViewId>,
) where
    F: Fn(&Scene, ViewId) -> bool,
{
    let Some(node) = scene.try_node(view) else {
        return;
    };
    for &child in &node.children {
        let Some(child_node) = scene.try_node(child) else {
            continue;
        };
        if child_node.kind.is_self_implemented() {
            continue;
        }
        if filter(scene, child) {
            result.push(child);
        }
        collect_composite_subtree(scene, child, filter, result);
    }
}

impl Scene {
    /// The last appearance delivered to `view`.
    pub fn appear_state(&self, view: ViewId) -> Option<AppearState> {
        self.try_node(view).map(|n| n.appear.state)
    }

    /// Run `callback` every time the view appears.
    ///
    /// If the view is currently appeared the callback also runs right away.
    pub fn on_appear<F>(&mut self, view: ViewId, callback: F)
    where
        F: FnMut(&mut Scene, ViewId) + 'static,
    {
        self.register_appear(view, AppearState::Appeared, Box::new(callback));
    }

    /// Run `callback` every time the view disappears.
    ///
    /// If the view is currently disappeared the callback also runs right away.
    pub fn on_disappear<F>(&mut self, view: ViewId, callback: F)
    where
        F: FnMut(&mut Scene, ViewId) + 'static,
    {
        self.register_appear(view, AppearState::Disappeared, Box::new(callback));
    }

    fn register_appear(&mut self, view: ViewId, state: AppearState, mut callback: ViewCallback) {
        let Some(node) = self.try_node(view) else {
            return;
        };
        if node.appear.state == state {
            callback(self, view);
        }
        if let Some(handlers) = self
            .try_node_mut(view)
            .and_then(|n| n.appear.handlers(state))
        {
            handlers.push(callback);
        }
    }

    /// Deliver `state` to a self-implemented view and its composite subtree.
    ///
    /// Views that already hold `state` are skipped. Delivery runs leaves first.
    pub fn appear_commit(&mut self, view: ViewId, state: AppearState) {
        let Some(node) = self.try_node(view) else {
            return;
        };
        if !node.kind.is_self_implemented() {
            return;
        }
        self.deliver_appearance(view, state);
    }

    /// Deliver `state` to a composite subtree that lost its self-implemented
    /// ancestor.
    pub(crate) fn appear_commit_detached(&mut self, view: ViewId, state: AppearState) {
        self.deliver_appearance(view, state);
    }

    fn deliver_appearance(&mut self, view: ViewId, state: AppearState) {
        let Some(node) = self.try_node(view) else {
            return;
        };
        if state == AppearState::Unset {
            return;
        }

        let mut targets_list = Vec::new();
        if node.appear.needs(state) {
            targets_list.push(view);
        }
        collect_composite_subtree(
            self,
            view,
            &|scene: &Scene, id| scene.try_node(id).is_some_and(|n| n.appear.needs(state)),
            &mut targets_list,
        );
        if targets_list.is_empty() {
            return;
        }
        tracing::trace!(
            target: targets::APPEAR,
            ?view,
            ?state,
            views = targets_list.len(),
            "delivering appearance"
        );

        for id in targets_list.into_iter().rev() {
            let Some(node) = self.try_node_mut(id) else {
                continue;
            };
            // A handler earlier in this pass may already have moved it there.
            if !node.appear.needs(state) {
                continue;
            }
            node.appear.state = state;
            self.run_appear_handlers(id, state);
        }
    }

    fn run_appear_handlers(&mut self, view: ViewId, state: AppearState) {
        let Some(mut handlers) = self
            .try_node_mut(view)
            .and_then(|n| n.appear.handlers(state))
            .map(std::mem::take)
        else {
            return;
        };
        for handler in handlers.iter_mut() {
            handler(self, view);
        }
        if let Some(slot) = self
            .try_node_mut(view)
            .and_then(|n| n.appear.handlers(state))
        {
            // Keep registration order: existing handlers, then any added while running.
            handlers.append(slot);
            *slot = handlers;
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

    #[test]
    fn test_registration_fires_when_state_matches() {
        let mut scene = Scene::new();
        let window = scene.create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(scene.appear_state(window), Some(AppearState::Appeared));

        let calls = Arc::new(Mutex::new(0));
        let c = calls.clone();
        scene.on_appear(window, move |_, _| *c.lock() += 1);
        assert_eq!(*calls.lock(), 1);

        let c = calls.clone();
        scene.on_disappear(window, move |_, _| *c.lock() += 100);
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_toggle_redelivers() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);
        let calls = Arc::new(Mutex::new(Vec::new()));

        let c = calls.clone();
        scene.on_appear(view, move |_, _| c.lock().push("appear"));
        let c = calls.clone();
        scene.on_disappear(view, move |_, _| c.lock().push("disappear"));

        scene.appear_commit(view, AppearState::Disappeared);
        scene.appear_commit(view, AppearState::Appeared);
        scene.appear_commit(view, AppearState::Appeared);
        scene.appear_commit(view, AppearState::Disappeared);

        assert_eq!(*calls.lock(), vec!["disappear", "appear", "disappear"]);
    }

    #[test]
    fn test_commit_on_composite_is_noop() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Composite);
        scene.appear_commit(view, AppearState::Appeared);
        assert_eq!(scene.appear_state(view), Some(AppearState::Unset));
    }

    #[test]
    fn test_propagation_stops_at_self_implemented() {
        let mut scene = Scene::new();
        let root = scene.create_view(ViewKind::Native);
        let composite = scene.create_view(ViewKind::Composite);
        let nested = scene.create_view(ViewKind::Composite);
        let native = scene.create_view(ViewKind::Native);
        let below_native = scene.create_view(ViewKind::Composite);
        scene.add_subview(root, composite).unwrap();
        scene.add_subview(composite, nested).unwrap();
        scene.add_subview(composite, native).unwrap();
        scene.add_subview(native, below_native).unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        for (view, label) in [
            (root, "root"),
            (composite, "composite"),
            (nested, "nested"),
            (native, "native"),
            (below_native, "below-native"),
        ] {
            let c = calls.clone();
            scene.on_appear(view, move |_, _| c.lock().push(label));
        }

        scene.appear_commit(root, AppearState::Appeared);

        assert_eq!(*calls.lock(), vec!["nested", "composite", "root"]);
        assert_eq!(scene.appear_state(native), Some(AppearState::Unset));
        assert_eq!(scene.appear_state(below_native), Some(AppearState::Unset));
    }

    #[test]
    fn test_handler_added_during_delivery_is_kept() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);
        let calls = Arc::new(Mutex::new(Vec::new()));

        let c = calls.clone();
        scene.on_appear(view, move |scene, id| {
            c.lock().push("outer");
            let inner = c.clone();
            // Registered while appeared, so it fires immediately as well.
            scene.on_appear(id, move |_, _| inner.lock().push("inner"));
        });

        scene.appear_commit(view, AppearState::Appeared);
        assert_eq!(*calls.lock(), vec!["outer", "inner"]);

        scene.appear_commit(view, AppearState::Disappeared);
        scene.appear_commit(view, AppearState::Appeared);
        assert_eq!(
            *calls.lock(),
            vec!["outer", "inner", "outer", "inner", "inner"]
        );
    }
}
