//! Error types for Horizon Trellis core.

use crate::view::ViewId;

/// Errors that can occur while manipulating the view arena.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The view handle is invalid or the view has been destroyed.
    #[error("Invalid or destroyed view {0:?}")]
    InvalidView(ViewId),

    /// Attempted to make a view a subview of itself or of one of its descendants.
    #[error("Cannot add {child:?} as a subview of its own descendant {parent:?}")]
    CircularParentage { parent: ViewId, child: ViewId },

    /// Windows are roots and can never be added as subviews.
    #[error("Window {0:?} cannot be added as a subview")]
    WindowAsSubview(ViewId),
}

/// A specialized Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;
