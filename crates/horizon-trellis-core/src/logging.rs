//! Logging and debugging facilities for Horizon Trellis.
//!
//! This module provides:
//! - `tracing` target names for filtering lifecycle logs by subsystem
//! - [`SceneTreeDebug`] for dumping a view tree with its lifecycle state
//!
//! # Tracing Integration
//!
//! Nothing is printed unless the host installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_trellis_core::render=trace")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! ```
//! use horizon_trellis_core::{Rect, Scene, ViewKind};
//! use horizon_trellis_core::logging::SceneTreeDebug;
//!
//! let mut scene = Scene::new();
//! let window = scene.create_window(Rect::new(0.0, 0.0, 320.0, 480.0));
//! let cell = scene.create_named_view(ViewKind::Native, "cell");
//! scene.add_subview(window, cell).unwrap();
//!
//! let dump = SceneTreeDebug::new(&scene).format_subtree(window).unwrap();
//! assert!(dump.contains("cell"));
//! ```

use std::fmt::{self, Write as FmtWrite};

use crate::error::Result;
use crate::scene::Scene;
use crate::view::ViewId;

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_trellis_core";
    /// View arena edits.
    pub const SCENE: &str = "horizon_trellis_core::scene";
    /// Main queue turns.
    pub const QUEUE: &str = "horizon_trellis_core::queue";
    /// Render milestones.
    pub const RENDER: &str = "horizon_trellis_core::render";
    /// Appear / disappear delivery.
    pub const APPEAR: &str = "horizon_trellis_core::appear";
    /// Layout delivery.
    pub const LAYOUT: &str = "horizon_trellis_core::layout";
    /// Trait delivery.
    pub const TRAIT: &str = "horizon_trellis_core::trait";
    /// Signal emission.
    pub const SIGNAL: &str = "horizon_trellis_core::signal";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Plain indentation.
    Compact,
}

/// Configuration for [`SceneTreeDebug`].
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Print view handles.
    pub show_ids: bool,
    /// Print view kinds.
    pub show_kinds: bool,
    /// Print render and appear state.
    pub show_states: bool,
    /// Print frames.
    pub show_frames: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_kinds: true,
            show_states: true,
            show_frames: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, frames included.
    pub fn detailed() -> Self {
        Self {
            show_frames: true,
            ..Default::default()
        }
    }

    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_kinds: false,
            show_states: false,
            show_frames: false,
            ..Default::default()
        }
    }
}

/// Renders a scene's view trees as text.
#[derive(Debug, Clone)]
pub struct SceneTreeDebug<'a> {
    scene: &'a Scene,
    options: TreeFormatOptions,
}

impl<'a> SceneTreeDebug<'a> {
    /// Create a visualizer with default options.
    pub fn new(scene: &'a Scene) -> Self {
        Self::with_options(scene, TreeFormatOptions::default())
    }

    /// Create a visualizer with custom options.
    pub fn with_options(scene: &'a Scene, options: TreeFormatOptions) -> Self {
        Self { scene, options }
    }

    /// Format every root view and its subtree.
    pub fn format_all(&self) -> Result<String> {
        let mut output = String::new();
        let _ = writeln!(output, "Scene ({} views):", self.scene.view_count());

        let roots = self.scene.root_views();
        if roots.is_empty() {
            output.push_str("  (empty)\n");
        }
        for root in roots {
            self.format_subtree_into(root, 0, true, &mut output)?;
        }
        Ok(output)
    }

    /// Format the subtree rooted at `root`.
    pub fn format_subtree(&self, root: ViewId) -> Result<String> {
        let mut output = String::new();
        self.format_subtree_into(root, 0, true, &mut output)?;
        Ok(output)
    }

    fn format_subtree_into(
        &self,
        id: ViewId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) -> Result<()> {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        let scene = self.scene;
        let name = scene.name(id)?;
        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(if name.is_empty() { "(unnamed)" } else { name });

        if self.options.show_ids {
            let _ = write!(output, " [{id:?}]");
        }
        if self.options.show_kinds {
            let _ = write!(output, " ({:?})", scene.kind(id)?);
        }
        if self.options.show_states {
            let render = scene.render_state(id).unwrap_or_default();
            let appear = scene.appear_state(id).unwrap_or_default();
            let _ = write!(output, " render={render:?} appear={appear:?}");
            if scene.is_hidden(id)? {
                output.push_str(" hidden");
            }
        }
        if self.options.show_frames {
            let frame = scene.frame(id)?;
            let _ = write!(
                output,
                " frame=({}, {}, {}, {})",
                frame.origin.x, frame.origin.y, frame.size.width, frame.size.height
            );
        }
        output.push('\n');

        let children = scene.subviews(id)?;
        let count = children.len();
        for (i, &child) in children.iter().enumerate() {
            self.format_subtree_into(child, depth + 1, i + 1 == count, output)?;
        }
        Ok(())
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix
    }
}

impl fmt::Display for SceneTreeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format_all() {
            Ok(output) => f.write_str(&output),
            Err(e) => write!(f, "Error formatting scene tree: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::view::ViewKind;

    fn sample() -> (Scene, ViewId) {
        let mut scene = Scene::new();
        let window = scene.create_window(Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.set_name(window, "window").unwrap();
        let table = scene.create_named_view(ViewKind::Native, "table");
        let row = scene.create_named_view(ViewKind::Composite, "row");
        scene.add_subview(window, table).unwrap();
        scene.add_subview(table, row).unwrap();
        (scene, window)
    }

    #[test]
    fn test_tree_format_hierarchy() {
        let (scene, window) = sample();
        let output = SceneTreeDebug::new(&scene).format_subtree(window).unwrap();

        assert!(output.starts_with("window"));
        assert!(output.contains("table"));
        assert!(output.contains("row"));
        assert!(output.contains("render=InTheScene"));
        assert!(output.contains("(Composite)"));
    }

    #[test]
    fn test_tree_format_minimal() {
        let (scene, window) = sample();
        let output = SceneTreeDebug::with_options(&scene, TreeFormatOptions::minimal())
            .format_subtree(window)
            .unwrap();

        assert!(output.contains("table"));
        assert!(!output.contains("render="));
        assert!(!output.contains('['));
    }

    #[test]
    fn test_tree_format_max_depth() {
        let (scene, window) = sample();
        let options = TreeFormatOptions {
            max_depth: Some(1),
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::minimal()
        };
        let output = SceneTreeDebug::with_options(&scene, options)
            .format_subtree(window)
            .unwrap();

        assert_eq!(output, "window\n`-- table\n");
    }

    #[test]
    fn test_format_all_counts_views() {
        let (scene, _) = sample();
        let output = SceneTreeDebug::new(&scene).to_string();
        assert!(output.starts_with("Scene (3 views):"));
    }
}
