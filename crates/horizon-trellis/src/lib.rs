//! Declarative lists for Horizon Trellis.
//!
//! Content is declared as a closed vocabulary of [`Node`]s: rows, headers,
//! footers, sections and for-each entries over reactive sequences. A
//! [`UicList`] turns that declaration into an immutable [`List`], presents it
//! to a native table through the [`TableHost`] trait, hosts each visible row
//! in a [`ReusableCell`] and feeds measured heights back to the table.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_trellis::{
//!     BatchId, ForEach, IndexPath, ListOptions, Node, RowNode, TableHost, TableUpdate, UicList,
//! };
//! use horizon_trellis_core::{Scene, Value, ViewKind};
//!
//! struct Table;
//!
//! impl TableHost for Table {
//!     fn reload_data(&mut self) {}
//!     fn apply(&mut self, _update: &TableUpdate, _batch: BatchId) {}
//!     fn refresh_layout(&mut self) {}
//! }
//!
//! let mut scene = Scene::new();
//! let names = Arc::new(Value::new(vec!["Ada".to_string(), "Grace".to_string()]));
//! let rows = ForEach::new(&names, |name: &String| {
//!     let name = name.clone();
//!     RowNode::new(move |scene| scene.create_named_view(ViewKind::Native, name.clone()))
//! });
//!
//! let list = UicList::new(
//!     &mut scene,
//!     vec![
//!         Node::header(|scene| scene.create_named_view(ViewKind::Native, "title")),
//!         Node::ForEachRows(rows),
//!     ],
//!     Table,
//!     ListOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(list.number_of_rows(0), 2);
//!
//! names.update(|names| names.push("Edsger".into()));
//! assert_eq!(list.number_of_rows(0), 3);
//!
//! let cell = list.cell_for_row(&mut scene, IndexPath::new(0, 2)).unwrap();
//! let hosted = scene.subviews(cell).unwrap()[0];
//! assert_eq!(scene.name(hosted).unwrap(), "Edsger");
//! ```

pub mod cell;
pub mod content;
mod error;
pub mod foreach;
pub mod host;
pub mod model;
pub mod options;
pub mod sizing;
pub mod state;
pub mod support;

pub use cell::{Anchor, CellAxis, Constraint, ReusableCell, SizeKind};
pub use content::{
    AccessoryType, ActionEdge, ActionHandler, ActionStyle, ContentBuilder, Node, RowAction,
    RowNode, SectionNode,
};
pub use error::{ContentError, ListError, Result};
pub use foreach::{ForEach, ForEachListener};
pub use host::{BatchId, RowAnimation, TableHost, TableUpdate};
pub use model::{ContentType, IndexPath, List, ListBindings, Row, Section};
pub use options::{CellStyle, ListOptions};
pub use sizing::{HeightCache, SizingTag};
pub use state::{Identifier, ListState, StateKind};
pub use support::{ActionContext, ListSupport, UicList, WeakList};

/// Tracing targets of the list engine.
///
/// ```bash
/// RUST_LOG=horizon_trellis::list=debug cargo run
/// ```
pub mod targets {
    /// Batches, rebuilds and reloads.
    pub const LIST: &str = "horizon_trellis::list";
    /// List construction.
    pub const MODEL: &str = "horizon_trellis::model";
    /// Cell hosting.
    pub const CELL: &str = "horizon_trellis::cell";
    /// Height feedback.
    pub const SIZING: &str = "horizon_trellis::sizing";
    /// Dynamic content.
    pub const FOR_EACH: &str = "horizon_trellis::for_each";
}
