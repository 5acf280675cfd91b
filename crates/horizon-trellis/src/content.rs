//! The declarative list vocabulary.
//!
//! List content is declared as a sequence of [`Node`]s. The vocabulary is
//! closed: rows, headers, footers, sections, and for-each entries producing
//! either rows or sections. Which combinations are legal is checked when a
//! [`List`](crate::List) is built.
//!
//! ```
//! use horizon_trellis::{Node, RowNode, AccessoryType};
//! use horizon_trellis_core::ViewKind;
//!
//! let content = vec![
//!     Node::header(|scene| scene.create_view(ViewKind::Native)),
//!     Node::Row(
//!         RowNode::new(|scene| scene.create_view(ViewKind::Composite))
//!             .with_accessory(AccessoryType::DisclosureIndicator),
//!     ),
//!     Node::footer(|scene| scene.create_view(ViewKind::Native)),
//! ];
//! assert_eq!(content.len(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

use horizon_trellis_core::{Scene, ViewId};
use serde::{Deserialize, Serialize};

use crate::foreach::ForEach;
use crate::support::ActionContext;

/// Builds the hosted view of a row, header or footer.
pub type ContentBuilder = Arc<dyn Fn(&mut Scene) -> ViewId + Send + Sync>;

/// Handler invoked when a swipe action is triggered.
pub type ActionHandler = Arc<dyn Fn(&mut Scene, &ActionContext) + Send + Sync>;

/// Decoration shown at the trailing edge of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessoryType {
    #[default]
    None,
    DisclosureIndicator,
    Checkmark,
    DetailButton,
}

/// Visual weight of a swipe action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionStyle {
    #[default]
    Normal,
    Destructive,
}

/// The edge a swipe action is revealed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionEdge {
    Leading,
    Trailing,
}

impl ActionEdge {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ActionEdge::Leading => "leading",
            ActionEdge::Trailing => "trailing",
        }
    }
}

/// A swipe action attached to a row.
#[derive(Clone)]
pub struct RowAction {
    title: String,
    style: ActionStyle,
    handler: ActionHandler,
}

impl RowAction {
    /// Create a normal action.
    pub fn new<F>(title: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Scene, &ActionContext) + Send + Sync + 'static,
    {
        Self {
            title: title.into(),
            style: ActionStyle::Normal,
            handler: Arc::new(handler),
        }
    }

    /// Create a destructive action.
    pub fn destructive<F>(title: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Scene, &ActionContext) + Send + Sync + 'static,
    {
        Self::new(title, handler).with_style(ActionStyle::Destructive)
    }

    /// Change the style.
    pub fn with_style(mut self, style: ActionStyle) -> Self {
        self.style = style;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn style(&self) -> ActionStyle {
        self.style
    }

    pub(crate) fn handler(&self) -> ActionHandler {
        self.handler.clone()
    }
}

impl fmt::Debug for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowAction")
            .field("title", &self.title)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

/// A declared row (also used for headers and footers).
#[derive(Clone)]
pub struct RowNode {
    content: ContentBuilder,
    trailing_actions: Vec<RowAction>,
    leading_actions: Vec<RowAction>,
    accessory: AccessoryType,
}

impl RowNode {
    /// Declare a row whose hosted view is produced by `content`.
    pub fn new<F>(content: F) -> Self
    where
        F: Fn(&mut Scene) -> ViewId + Send + Sync + 'static,
    {
        Self {
            content: Arc::new(content),
            trailing_actions: Vec::new(),
            leading_actions: Vec::new(),
            accessory: AccessoryType::None,
        }
    }

    /// Set the actions revealed by swiping from the trailing edge.
    pub fn with_trailing_actions(mut self, actions: Vec<RowAction>) -> Self {
        self.trailing_actions = actions;
        self
    }

    /// Set the actions revealed by swiping from the leading edge.
    pub fn with_leading_actions(mut self, actions: Vec<RowAction>) -> Self {
        self.leading_actions = actions;
        self
    }

    /// Set the accessory.
    pub fn with_accessory(mut self, accessory: AccessoryType) -> Self {
        self.accessory = accessory;
        self
    }

    pub fn content(&self) -> &ContentBuilder {
        &self.content
    }

    pub fn trailing_actions(&self) -> &[RowAction] {
        &self.trailing_actions
    }

    pub fn leading_actions(&self) -> &[RowAction] {
        &self.leading_actions
    }

    pub fn accessory(&self) -> AccessoryType {
        self.accessory
    }
}

impl fmt::Debug for RowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowNode")
            .field("trailing_actions", &self.trailing_actions)
            .field("leading_actions", &self.leading_actions)
            .field("accessory", &self.accessory)
            .finish_non_exhaustive()
    }
}

/// A declared section.
///
/// Its contents must be row-shaped: rows and for-each rows, optionally
/// preceded by one header and followed by one footer.
#[derive(Clone, Debug, Default)]
pub struct SectionNode {
    content: Vec<Node>,
}

impl SectionNode {
    pub fn new(content: Vec<Node>) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }
}

/// One entry of declared list content.
#[derive(Clone)]
pub enum Node {
    Row(RowNode),
    Header(RowNode),
    Footer(RowNode),
    Section(SectionNode),
    /// Rows produced from a reactive sequence.
    ForEachRows(ForEach<RowNode>),
    /// Sections produced from a reactive sequence.
    ForEachSections(ForEach<SectionNode>),
}

impl Node {
    /// Shorthand for `Node::Row(RowNode::new(content))`.
    pub fn row<F>(content: F) -> Self
    where
        F: Fn(&mut Scene) -> ViewId + Send + Sync + 'static,
    {
        Node::Row(RowNode::new(content))
    }

    /// Shorthand for a header node.
    pub fn header<F>(content: F) -> Self
    where
        F: Fn(&mut Scene) -> ViewId + Send + Sync + 'static,
    {
        Node::Header(RowNode::new(content))
    }

    /// Shorthand for a footer node.
    pub fn footer<F>(content: F) -> Self
    where
        F: Fn(&mut Scene) -> ViewId + Send + Sync + 'static,
    {
        Node::Footer(RowNode::new(content))
    }

    /// Shorthand for a section node.
    pub fn section(content: Vec<Node>) -> Self {
        Node::Section(SectionNode::new(content))
    }

    /// A short name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Row(_) => "row",
            Node::Header(_) => "header",
            Node::Footer(_) => "footer",
            Node::Section(_) => "section",
            Node::ForEachRows(_) => "for-each of rows",
            Node::ForEachSections(_) => "for-each of sections",
        }
    }

    /// Rows and for-each rows.
    pub fn is_row_entry(&self) -> bool {
        matches!(self, Node::Row(_) | Node::ForEachRows(_))
    }

    /// Sections and for-each sections.
    pub fn is_section_entry(&self) -> bool {
        matches!(self, Node::Section(_) | Node::ForEachSections(_))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Row(row) => f.debug_tuple("Row").field(row).finish(),
            Node::Header(row) => f.debug_tuple("Header").field(row).finish(),
            Node::Footer(row) => f.debug_tuple("Footer").field(row).finish(),
            Node::Section(section) => f.debug_tuple("Section").field(section).finish(),
            Node::ForEachRows(each) => f.debug_tuple("ForEachRows").field(&each.len()).finish(),
            Node::ForEachSections(each) => {
                f.debug_tuple("ForEachSections").field(&each.len()).finish()
            }
        }
    }
}

static_assertions::assert_impl_all!(Node: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_trellis_core::ViewKind;

    #[test]
    fn test_row_node_builder() {
        let node = RowNode::new(|scene| scene.create_view(ViewKind::Native))
            .with_accessory(AccessoryType::Checkmark)
            .with_trailing_actions(vec![RowAction::destructive("Delete", |_, _| {})])
            .with_leading_actions(vec![RowAction::new("Pin", |_, _| {})]);

        assert_eq!(node.accessory(), AccessoryType::Checkmark);
        assert_eq!(node.trailing_actions()[0].title(), "Delete");
        assert_eq!(node.trailing_actions()[0].style(), ActionStyle::Destructive);
        assert_eq!(node.leading_actions()[0].style(), ActionStyle::Normal);

        let mut scene = Scene::new();
        let view = (node.content())(&mut scene);
        assert!(scene.contains(view));
    }

    #[test]
    fn test_entry_classes() {
        let row = Node::row(|scene| scene.create_view(ViewKind::Native));
        let section = Node::section(vec![]);
        let header = Node::header(|scene| scene.create_view(ViewKind::Native));

        assert!(row.is_row_entry());
        assert!(!row.is_section_entry());
        assert!(section.is_section_entry());
        assert!(!header.is_row_entry());
        assert_eq!(header.kind_name(), "header");
    }
}
