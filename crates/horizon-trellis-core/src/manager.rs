//! Mapping of native lifecycle hooks onto the trackers.
//!
//! A host toolkit forwards the overridden lifecycle methods of its views to a
//! [`RenderManager`]. [`Scene`] implements it and calls the hooks itself during
//! structural edits, so hosts that drive the scene directly never need to call
//! them by hand.
//!
//! | hook | effect |
//! |---|---|
//! | will-move-to-superview(`Some`) | commit render `NotRendered` |
//! | did-move-to-superview | if attached, commit render `Rendered` |
//! | did-move-to-window | with a window, commit render `InTheScene`; re-derive appearance |
//! | layout-subviews | commit layout, then re-derive appearance |
//! | frame / hidden changed | re-derive appearance |
//! | trait collection changed | commit trait |
//!
//! Appearance is `Appeared` exactly when the view has a window, is not hidden
//! and has strictly positive width and height. Composite views never commit
//! on their own: they follow their nearest self-implemented ancestor.

use crate::appear::AppearState;
use crate::render::RenderState;
use crate::scene::Scene;
use crate::view::ViewId;

/// Native lifecycle hooks.
pub trait RenderManager {
    /// The view is about to move to `new_superview`.
    fn will_move_to_superview(&mut self, view: ViewId, new_superview: Option<ViewId>);

    /// The view's superview changed.
    fn did_move_to_superview(&mut self, view: ViewId);

    /// The view's window changed.
    fn did_move_to_window(&mut self, view: ViewId);

    /// The view finished laying out its subviews.
    fn layout_subviews(&mut self, view: ViewId);

    /// The view's frame changed.
    fn frame_did_change(&mut self, view: ViewId);

    /// The view was hidden or shown.
    fn hidden_did_change(&mut self, view: ViewId);

    /// The view's effective traits changed.
    fn trait_collection_did_change(&mut self, view: ViewId);
}

impl Scene {
    /// Commit the appearance implied by the view's window, visibility and frame.
    ///
    /// For a composite view the nearest self-implemented ancestor is
    /// re-derived instead, which also reaches the composite. A composite
    /// without such an ancestor has been detached and only ever disappears.
    pub fn update_appearance(&mut self, view: ViewId) {
        let Some(node) = self.try_node(view) else {
            return;
        };
        if node.kind.is_self_implemented() {
            let state = self.derived_appearance(view);
            self.appear_commit(view, state);
            return;
        }

        match self.self_implemented_ancestor(view) {
            Some(owner) => {
                let state = self.derived_appearance(owner);
                self.appear_commit(owner, state);
            }
            None if self.appear_state(view) == Some(AppearState::Appeared) => {
                self.appear_commit_detached(view, AppearState::Disappeared);
            }
            None => {}
        }
    }

    fn derived_appearance(&self, view: ViewId) -> AppearState {
        let Some(node) = self.try_node(view) else {
            return AppearState::Disappeared;
        };
        let visible = !node.hidden && !node.frame.is_empty();
        let attached = matches!(self.window(view), Ok(Some(_)));
        if attached && visible {
            AppearState::Appeared
        } else {
            AppearState::Disappeared
        }
    }

    fn self_implemented_ancestor(&self, view: ViewId) -> Option<ViewId> {
        let mut current = self.try_node(view)?.parent;
        while let Some(id) = current {
            let node = self.try_node(id)?;
            if node.kind.is_self_implemented() {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }
}

impl RenderManager for Scene {
    fn will_move_to_superview(&mut self, view: ViewId, new_superview: Option<ViewId>) {
        if new_superview.is_some() {
            self.render_commit(view, RenderState::NotRendered);
        }
    }

    fn did_move_to_superview(&mut self, view: ViewId) {
        if matches!(self.superview(view), Ok(Some(_))) {
            self.render_commit(view, RenderState::Rendered);
        }
    }

    fn did_move_to_window(&mut self, view: ViewId) {
        if matches!(self.window(view), Ok(Some(_))) {
            self.render_commit(view, RenderState::InTheScene);
        }
        self.update_appearance(view);
    }

    fn layout_subviews(&mut self, view: ViewId) {
        self.layout_commit(view);
        self.update_appearance(view);
    }

    fn frame_did_change(&mut self, view: ViewId) {
        self.update_appearance(view);
    }

    fn hidden_did_change(&mut self, view: ViewId) {
        self.update_appearance(view);
    }

    fn trait_collection_did_change(&mut self, view: ViewId) {
        self.trait_commit(view);
    }
}
