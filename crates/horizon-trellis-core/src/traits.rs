//! Environment traits.
//!
//! A [`TraitCollection`] describes the environment a view is displayed in.
//! Traits are inherited: a view without an explicit collection uses the one of
//! its nearest ancestor that has one, or the default collection. Trait
//! handlers fire once on registration and again after every change of the
//! view's effective traits, with the same propagation shape as layout.

use crate::appear::collect_composite_subtree;
use crate::error::Result;
use crate::logging::targets;
use crate::scene::Scene;
use crate::view::ViewId;

/// Horizontal or vertical size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeClass {
    #[default]
    Unspecified,
    Compact,
    Regular,
}

/// Preferred text size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ContentSizeCategory {
    ExtraSmall,
    Small,
    Medium,
    #[default]
    Large,
    ExtraLarge,
    ExtraExtraLarge,
    ExtraExtraExtraLarge,
    AccessibilityMedium,
    AccessibilityLarge,
    AccessibilityExtraLarge,
    AccessibilityExtraExtraLarge,
    AccessibilityExtraExtraExtraLarge,
}

impl ContentSizeCategory {
    /// Whether this is one of the accessibility sizes.
    pub fn is_accessibility_category(self) -> bool {
        self >= ContentSizeCategory::AccessibilityMedium
    }
}

/// Light or dark appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterfaceStyle {
    #[default]
    Unspecified,
    Light,
    Dark,
}

/// The environment a view is displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraitCollection {
    pub horizontal_size_class: SizeClass,
    pub vertical_size_class: SizeClass,
    pub content_size_category: ContentSizeCategory,
    pub interface_style: InterfaceStyle,
}

impl TraitCollection {
    /// Create the default collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the horizontal size class.
    pub fn with_horizontal_size_class(mut self, size_class: SizeClass) -> Self {
        self.horizontal_size_class = size_class;
        self
    }

    /// Set the vertical size class.
    pub fn with_vertical_size_class(mut self, size_class: SizeClass) -> Self {
        self.vertical_size_class = size_class;
        self
    }

    /// Set the content size category.
    pub fn with_content_size_category(mut self, category: ContentSizeCategory) -> Self {
        self.content_size_category = category;
        self
    }

    /// Set the interface style.
    pub fn with_interface_style(mut self, style: InterfaceStyle) -> Self {
        self.interface_style = style;
        self
    }
}

/// A persistent trait handler.
pub type TraitCallback = Box<dyn FnMut(&mut Scene, ViewId, &TraitCollection) + 'static>;

#[derive(Default)]
pub(crate) struct TraitTracker {
    handlers: Vec<TraitCallback>,
}

impl Scene {
    /// The traits `view` is displayed with.
    pub fn traits(&self, view: ViewId) -> Result<TraitCollection> {
        let mut current = Some(view);
        while let Some(id) = current {
            let node = self.node(id)?;
            if let Some(traits) = node.traits {
                return Ok(traits);
            }
            current = node.parent;
        }
        Ok(TraitCollection::default())
    }

    /// Override the traits of `view` (`None` inherits again).
    ///
    /// Every self-implemented view in the subtree whose effective traits
    /// changed receives the trait-changed hook.
    pub fn set_traits(&mut self, view: ViewId, traits: Option<TraitCollection>) -> Result<()> {
        let before = self.effective_traits_snapshot(view)?;
        self.node_mut(view)?.traits = traits;
        self.notify_trait_changes(before);
        Ok(())
    }

    /// Run `callback` now and after every change of the view's traits.
    pub fn on_trait<F>(&mut self, view: ViewId, callback: F)
    where
        F: FnMut(&mut Scene, ViewId, &TraitCollection) + 'static,
    {
        let mut callback: TraitCallback = Box::new(callback);
        let Ok(traits) = self.traits(view) else {
            return;
        };
        callback(self, view, &traits);
        if let Some(node) = self.try_node_mut(view) {
            node.trait_tracker.handlers.push(callback);
        }
    }

    /// Deliver a trait change to a self-implemented view and its composite
    /// subtree, leaves first.
    pub fn trait_commit(&mut self, view: ViewId) {
        let Some(node) = self.try_node(view) else {
            return;
        };
        if !node.kind.is_self_implemented() {
            return;
        }

        let mut views = vec![view];
        collect_composite_subtree(self, view, &|_: &Scene, _| true, &mut views);
        tracing::trace!(target: targets::TRAIT, ?view, views = views.len(), "delivering trait change");

        for id in views.into_iter().rev() {
            self.run_trait_handlers(id);
        }
    }

    fn run_trait_handlers(&mut self, view: ViewId) {
        let Ok(traits) = self.traits(view) else {
            return;
        };
        let Some(mut handlers) = self
            .try_node_mut(view)
            .map(|n| std::mem::take(&mut n.trait_tracker.handlers))
        else {
            return;
        };
        for handler in handlers.iter_mut() {
            handler(self, view, &traits);
        }
        if let Some(node) = self.try_node_mut(view) {
            handlers.append(&mut node.trait_tracker.handlers);
            node.trait_tracker.handlers = handlers;
        }
    }

    pub(crate) fn effective_traits_snapshot(
        &self,
        root: ViewId,
    ) -> Result<Vec<(ViewId, TraitCollection)>> {
        self.depth_first_preorder(root)?
            .into_iter()
            .map(|id| Ok((id, self.traits(id)?)))
            .collect()
    }

    /// Fire the trait-changed hook on every view whose traits differ from
    /// `before`.
    pub(crate) fn notify_trait_changes(&mut self, before: Vec<(ViewId, TraitCollection)>) {
        use crate::manager::RenderManager;

        for (id, old) in before {
            match self.traits(id) {
                Ok(new) if new != old => self.trait_collection_did_change(id),
                _ => {}
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

    #[test]
    fn test_traits_inherit_from_ancestors() {
        let mut scene = Scene::new();
        let window = scene.create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        let view = scene.create_view(ViewKind::Native);
        scene.add_subview(window, view).unwrap();

        let dark = TraitCollection::new().with_interface_style(InterfaceStyle::Dark);
        scene.set_traits(window, Some(dark)).unwrap();
        assert_eq!(scene.traits(view).unwrap(), dark);

        scene.remove_from_superview(view).unwrap();
        assert_eq!(scene.traits(view).unwrap(), TraitCollection::default());
    }

    #[test]
    fn test_registration_fires_immediately() {
        let mut scene = Scene::new();
        let view = scene.create_view(ViewKind::Composite);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        scene.on_trait(view, move |_, _, traits| s.lock().push(traits.content_size_category));

        assert_eq!(*seen.lock(), vec![ContentSizeCategory::Large]);
    }

    #[test]
    fn test_change_reaches_composite_subtree() {
        let mut scene = Scene::new();
        let window = scene.create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        let native = scene.create_view(ViewKind::Native);
        let composite = scene.create_view(ViewKind::Composite);
        scene.add_subview(window, native).unwrap();
        scene.add_subview(native, composite).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for (view, label) in [(native, "native"), (composite, "composite")] {
            let s = seen.clone();
            scene.on_trait(view, move |_, _, traits| s.lock().push((label, traits.horizontal_size_class)));
        }
        seen.lock().clear();

        let compact = TraitCollection::new().with_horizontal_size_class(SizeClass::Compact);
        scene.set_traits(window, Some(compact)).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                ("composite", SizeClass::Compact),
                ("native", SizeClass::Compact),
            ]
        );

        // Unchanged traits notify nobody.
        seen.lock().clear();
        scene.set_traits(window, Some(compact)).unwrap();
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_accessibility_categories() {
        assert!(!ContentSizeCategory::ExtraExtraExtraLarge.is_accessibility_category());
        assert!(ContentSizeCategory::AccessibilityMedium.is_accessibility_category());
    }
}
