//! Layout pass notifications.
//!
//! Layout handlers run on every layout pass of the owning self-implemented
//! view, for the view itself and its composite subtree, leaves first. There is
//! no "already delivered" suppression.

use crate::appear::{collect_composite_subtree, ViewCallback};
use crate::logging::targets;
use crate::scene::Scene;
use crate::view::ViewId;

#[derive(Default)]
pub(crate) struct LayoutTracker {
    handlers: Vec<ViewCallback>,
}

impl Scene {
    /// Run `callback` after every layout pass reaching `view`.
    ///
    /// Fires right away as well when the view already has a non-empty frame.
    pub fn on_layout<F>(&mut self, view: ViewId, callback: F)
    where
        F: FnMut(&mut Scene, ViewId) + 'static,
    {
        let mut callback: ViewCallback = Box::new(callback);
        let Some(node) = self.try_node(view) else {
            return;
        };
        if !node.frame.is_empty() {
            callback(self, view);
        }
        if let Some(node) = self.try_node_mut(view) {
            node.layout.handlers.push(callback);
        }
    }

    /// Deliver a layout pass to a self-implemented view and its composite
    /// subtree.
    pub fn layout_commit(&mut self, view: ViewId) {
        let Some(node) = self.try_node(view) else {
            return;
        };
        if !node.kind.is_self_implemented() {
            return;
        }

        let mut views = vec![view];
        collect_composite_subtree(self, view, &|_: &Scene, _| true, &mut views);
        tracing::trace!(target: targets::LAYOUT, ?view, views = views.len(), "delivering layout");

        for id in views.into_iter().rev() {
            self.run_layout_handlers(id);
        }
    }

    fn run_layout_handlers(&mut self, view: ViewId) {
        let Some(mut handlers) = self
            .try_node_mut(view)
            .map(|n| std::mem::take(&mut n.layout.handlers))
        else {
            return;
        };
        if handlers.is_empty() {
            return;
        }
        for handler in handlers.iter_mut() {
            handler(self, view);
        }
        if let Some(node) = self.try_node_mut(view) {
            handlers.append(&mut node.layout.handlers);
            node.layout.handlers = handlers;
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
    fn test_registration_requires_non_empty_frame() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Native);
        let calls = Arc::new(Mutex::new(0));

        let c = calls.clone();
        scene.on_layout(view, move |_, _| *c.lock() += 1);
        assert_eq!(*calls.lock(), 0);

        scene.set_frame(view, Rect::new(0.0, 0.0, 5.0, 5.0)).unwrap();
        let c = calls.clone();
        scene.on_layout(view, move |_, _| *c.lock() += 1);
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_every_pass_redelivers() {
        let mut scene = Scene::new();
        let root = scene.create_view(ViewKind::Native);
        let composite = scene.create_view(ViewKind::Composite);
        scene.add_subview(root, composite).unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for (view, label) in [(root, "root"), (composite, "composite")] {
            let c = calls.clone();
            scene.on_layout(view, move |_, _| c.lock().push(label));
        }

        scene.layout_commit(root);
        scene.layout_commit(root);
        // Composites are reached through their native ancestor only.
        scene.layout_commit(composite);

        assert_eq!(
            *calls.lock(),
            vec!["composite", "root", "composite", "root"]
        );
    }
}
