//! Immutable list model built from declared content.
//!
//! A [`List`] is an ordered sequence of [`Section`]s; each section holds an
//! optional header, an optional footer and its content [`Row`]s. Section
//! indices and row index paths are contiguous and zero-based after every
//! rebuild. Values are never mutated in place: edits produce new values
//! through the `with_*` and `inserting_*`/`removing_*` methods.
//!
//! # Classification
//!
//! Top-level content is either *row-shaped* (rows and for-each rows,
//! optionally preceded by one header and followed by one footer), which
//! becomes a single implicit section, or made entirely of sections and
//! for-each sections. Section contents must themselves be row-shaped.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use horizon_trellis_core::{Scene, Subscription, ViewId};

use crate::cell::SizeKind;
use crate::content::{AccessoryType, ContentBuilder, Node, RowAction, RowNode};
use crate::error::ContentError;
use crate::foreach::ForEachListener;
use crate::targets;

// ============================================================================
// IndexPath
// ============================================================================

/// Address of a content row: section index and row offset within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    #[inline]
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(section {}, row {})", self.section, self.row)
    }
}

/// How a structural change moves existing index paths.
///
/// Insertions carry final positions, deletions carry positions in the list
/// before the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathDelta {
    InsertRows(BTreeSet<IndexPath>),
    DeleteRows(BTreeSet<IndexPath>),
    InsertSections(BTreeSet<usize>),
    DeleteSections(BTreeSet<usize>),
}

impl PathDelta {
    /// Where the entry of `kind` at `path` ends up, or `None` if it is gone.
    /// Headers and footers only follow their section.
    pub(crate) fn map(&self, kind: SizeKind, path: IndexPath) -> Option<IndexPath> {
        match self {
            PathDelta::InsertRows(inserted) if kind == SizeKind::Row => {
                let section = path.section;
                let row = skip_inserted(
                    path.row,
                    inserted.iter().filter(|p| p.section == section).map(|p| p.row),
                );
                Some(IndexPath::new(section, row))
            }
            PathDelta::DeleteRows(deleted) if kind == SizeKind::Row => {
                if deleted.contains(&path) {
                    return None;
                }
                let before = deleted
                    .iter()
                    .filter(|p| p.section == path.section && p.row < path.row)
                    .count();
                Some(IndexPath::new(path.section, path.row - before))
            }
            PathDelta::InsertRows(_) | PathDelta::DeleteRows(_) => Some(path),
            PathDelta::InsertSections(inserted) => Some(IndexPath::new(
                skip_inserted(path.section, inserted.iter().copied()),
                path.row,
            )),
            PathDelta::DeleteSections(deleted) => {
                if deleted.contains(&path.section) {
                    return None;
                }
                let before = deleted.range(..path.section).count();
                Some(IndexPath::new(path.section - before, path.row))
            }
        }
    }
}

/// The `old`-th position not taken by one of the ascending `inserted` ones.
fn skip_inserted(old: usize, inserted: impl Iterator<Item = usize>) -> usize {
    let mut position = old;
    for taken in inserted {
        if taken <= position {
            position += 1;
        } else {
            break;
        }
    }
    position
}

// ============================================================================
// Row
// ============================================================================

/// What a [`Row`] stands for within its section.
#[derive(Debug, Clone)]
pub enum ContentType {
    /// Header of the given section.
    Header(usize),
    /// Footer of the given section.
    Footer(usize),
    /// A content row.
    Row {
        trailing_actions: Vec<RowAction>,
        leading_actions: Vec<RowAction>,
        accessory: AccessoryType,
        index_path: IndexPath,
    },
}

/// One materializable entry of a section.
#[derive(Clone)]
pub struct Row {
    content: ContentBuilder,
    content_type: ContentType,
}

impl Row {
    /// A content row at `index_path`.
    pub fn row(index_path: IndexPath, node: &RowNode) -> Self {
        Self {
            content: node.content().clone(),
            content_type: ContentType::Row {
                trailing_actions: node.trailing_actions().to_vec(),
                leading_actions: node.leading_actions().to_vec(),
                accessory: node.accessory(),
                index_path,
            },
        }
    }

    /// The header of `section`.
    pub fn header(section: usize, node: &RowNode) -> Self {
        Self {
            content: node.content().clone(),
            content_type: ContentType::Header(section),
        }
    }

    /// The footer of `section`.
    pub fn footer(section: usize, node: &RowNode) -> Self {
        Self {
            content: node.content().clone(),
            content_type: ContentType::Footer(section),
        }
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Index path of a content row, `None` for headers and footers.
    pub fn index_path(&self) -> Option<IndexPath> {
        match &self.content_type {
            ContentType::Row { index_path, .. } => Some(*index_path),
            _ => None,
        }
    }

    /// The section this row belongs to.
    pub fn section(&self) -> usize {
        match &self.content_type {
            ContentType::Header(section) | ContentType::Footer(section) => *section,
            ContentType::Row { index_path, .. } => index_path.section,
        }
    }

    pub fn size_kind(&self) -> SizeKind {
        match &self.content_type {
            ContentType::Header(_) => SizeKind::Header,
            ContentType::Footer(_) => SizeKind::Footer,
            ContentType::Row { .. } => SizeKind::Row,
        }
    }

    /// Key under which measured sizes of this row are cached.
    ///
    /// Headers and footers use row 0 of their section.
    pub fn sizing_key(&self) -> (SizeKind, IndexPath) {
        let path = self
            .index_path()
            .unwrap_or_else(|| IndexPath::new(self.section(), 0));
        (self.size_kind(), path)
    }

    pub fn trailing_actions(&self) -> &[RowAction] {
        match &self.content_type {
            ContentType::Row { trailing_actions, .. } => trailing_actions,
            _ => &[],
        }
    }

    pub fn leading_actions(&self) -> &[RowAction] {
        match &self.content_type {
            ContentType::Row { leading_actions, .. } => leading_actions,
            _ => &[],
        }
    }

    pub fn accessory(&self) -> AccessoryType {
        match &self.content_type {
            ContentType::Row { accessory, .. } => *accessory,
            _ => AccessoryType::None,
        }
    }

    /// Instantiate the hosted view.
    pub fn build_content(&self, scene: &mut Scene) -> ViewId {
        (self.content)(scene)
    }

    /// The same row moved to `index_path`. Headers and footers only take
    /// the section.
    pub fn with_index_path(&self, index_path: IndexPath) -> Self {
        let content_type = match &self.content_type {
            ContentType::Header(_) => ContentType::Header(index_path.section),
            ContentType::Footer(_) => ContentType::Footer(index_path.section),
            ContentType::Row {
                trailing_actions,
                leading_actions,
                accessory,
                ..
            } => ContentType::Row {
                trailing_actions: trailing_actions.clone(),
                leading_actions: leading_actions.clone(),
                accessory: *accessory,
                index_path,
            },
        };
        Self {
            content: self.content.clone(),
            content_type,
        }
    }

    /// The same row moved to `section`, keeping its offset.
    pub fn with_section(&self, section: usize) -> Self {
        let row = self.index_path().map_or(0, |path| path.row);
        self.with_index_path(IndexPath::new(section, row))
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Section
// ============================================================================

/// One section of a [`List`].
#[derive(Debug, Clone, Default)]
pub struct Section {
    index: usize,
    header: Option<Row>,
    footer: Option<Row>,
    rows: Vec<Row>,
}

impl Section {
    /// Create a section; every entry is reindexed to `index`.
    pub fn new(index: usize, header: Option<Row>, footer: Option<Row>, rows: Vec<Row>) -> Self {
        Self {
            index,
            header: None,
            footer: None,
            rows: Vec::new(),
        }
        .with_header(header)
        .with_footer(footer)
        .with_rows(rows)
    }

    /// The same section at `index`.
    pub fn with_index(&self, index: usize) -> Self {
        Self {
            index,
            header: self.header.as_ref().map(|h| h.with_section(index)),
            footer: self.footer.as_ref().map(|f| f.with_section(index)),
            rows: self.rows.iter().map(|r| r.with_section(index)).collect(),
        }
    }

    /// Replace the rows, renumbering them from zero.
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        let index = self.index;
        self.rows = rows
            .iter()
            .enumerate()
            .map(|(offset, row)| row.with_index_path(IndexPath::new(index, offset)))
            .collect();
        self
    }

    pub fn with_header(mut self, header: Option<Row>) -> Self {
        self.header = header.map(|h| h.with_section(self.index));
        self
    }

    pub fn with_footer(mut self, footer: Option<Row>) -> Self {
        self.footer = footer.map(|f| f.with_section(self.index));
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Build a section from row-shaped content.
    pub(crate) fn build(
        index: usize,
        nodes: &[Node],
        bindings: &mut ListBindings,
    ) -> Result<Self, ContentError> {
        build_section(index, nodes, bindings)
    }

    pub fn header(&self) -> Option<&Row> {
        self.header.as_ref()
    }

    pub fn footer(&self) -> Option<&Row> {
        self.footer.as_ref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Insert rows at their final offsets.
    ///
    /// Offsets are applied in ascending order, each against the rows
    /// inserted before it. Fails with the first offset past the end.
    pub fn inserting_rows(&self, mut rows: Vec<(usize, Row)>) -> Result<Self, usize> {
        rows.sort_by_key(|(offset, _)| *offset);
        let mut current = self.rows.clone();
        for (offset, row) in rows {
            if offset > current.len() {
                return Err(offset);
            }
            current.insert(offset, row);
        }
        Ok(self.clone().with_rows(current))
    }

    /// Remove the rows at the given offsets (offsets before removal).
    pub fn removing_rows(&self, offsets: &BTreeSet<usize>) -> Self {
        let kept: Vec<Row> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(offset, _)| !offsets.contains(offset))
            .map(|(_, row)| row.clone())
            .collect();
        self.clone().with_rows(kept)
    }
}

// ============================================================================
// ListBindings
// ============================================================================

/// Subscriptions to the dynamic entries of a list.
///
/// While alive, any change to a watched for-each output calls the rebuild
/// hook. Dropping the bindings stops observation.
#[derive(Default)]
pub struct ListBindings {
    on_change: Option<Arc<dyn Fn() + Send + Sync>>,
    subscriptions: Vec<Subscription>,
}

impl ListBindings {
    /// Bindings that observe nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings calling `rebuild` whenever a dynamic entry changes.
    pub fn with_rebuild<F>(rebuild: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            on_change: Some(Arc::new(rebuild)),
            subscriptions: Vec::new(),
        }
    }

    pub(crate) fn watch<E>(&mut self, listener: &ForEachListener<E>)
    where
        E: Clone + Send + Sync + 'static,
    {
        let Some(on_change) = self.on_change.clone() else {
            return;
        };
        self.subscriptions
            .push(listener.on_contents_changed(move |_| on_change()));
    }

    /// Number of watched dynamic entries.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl fmt::Debug for ListBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListBindings")
            .field("rebuild", &self.on_change.is_some())
            .field("watched", &self.subscriptions.len())
            .finish()
    }
}

// ============================================================================
// List
// ============================================================================

/// An ordered sequence of sections.
#[derive(Debug, Clone, Default)]
pub struct List {
    sections: Vec<Section>,
}

impl List {
    /// Build a list from declared content, watching its dynamic entries
    /// through `bindings`.
    ///
    /// # Errors
    ///
    /// Returns a [`ContentError`] if the content mixes rows with sections,
    /// nests sections, or places a header or footer anywhere but first or
    /// last.
    pub fn build(nodes: &[Node], bindings: &mut ListBindings) -> Result<Self, ContentError> {
        let sections = if nodes.iter().any(Node::is_section_entry) {
            build_sections(nodes, bindings)?
        } else {
            vec![build_section(0, nodes, bindings)?]
        };

        tracing::debug!(
            target: targets::MODEL,
            sections = sections.len(),
            watched = bindings.len(),
            "built list"
        );
        Ok(Self { sections })
    }

    /// Build a list without observing dynamic entries.
    pub fn new(nodes: &[Node]) -> Result<Self, ContentError> {
        Self::build(nodes, &mut ListBindings::new())
    }

    /// Assemble a list from sections, renumbering them from zero.
    pub fn from_sections(sections: Vec<Section>) -> Self {
        Self {
            sections: sections
                .iter()
                .enumerate()
                .map(|(index, section)| section.with_index(index))
                .collect(),
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn row(&self, index_path: IndexPath) -> Option<&Row> {
        self.sections
            .get(index_path.section)?
            .rows()
            .get(index_path.row)
    }

    /// Whether `index_path` addresses an existing row.
    pub fn contains_row(&self, index_path: IndexPath) -> bool {
        self.row(index_path).is_some()
    }

    /// The list without the given rows, renumbered.
    pub fn removing_rows(&self, paths: &BTreeSet<IndexPath>) -> Self {
        let sections = self
            .sections
            .iter()
            .map(|section| {
                let offsets: BTreeSet<usize> = paths
                    .iter()
                    .filter(|path| path.section == section.index())
                    .map(|path| path.row)
                    .collect();
                if offsets.is_empty() {
                    section.clone()
                } else {
                    section.removing_rows(&offsets)
                }
            })
            .collect();
        Self { sections }
    }

    /// The list with rows inserted at their final index paths.
    ///
    /// Returns the first index path that cannot be inserted on failure.
    pub fn inserting_rows(&self, rows: Vec<(IndexPath, Row)>) -> Result<Self, IndexPath> {
        let mut sections = self.sections.clone();
        let mut by_section: Vec<Vec<(usize, Row)>> = vec![Vec::new(); sections.len()];
        for (path, row) in rows {
            let Some(bucket) = by_section.get_mut(path.section) else {
                return Err(path);
            };
            bucket.push((path.row, row));
        }
        for (index, bucket) in by_section.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            sections[index] = sections[index]
                .inserting_rows(bucket)
                .map_err(|offset| IndexPath::new(index, offset))?;
        }
        Ok(Self { sections })
    }

    /// The list without the given sections, renumbered.
    pub fn removing_sections(&self, indices: &BTreeSet<usize>) -> Self {
        Self::from_sections(
            self.sections
                .iter()
                .filter(|section| !indices.contains(&section.index()))
                .cloned()
                .collect(),
        )
    }

    /// The list with sections inserted at their final indices.
    ///
    /// Returns the first index that cannot be inserted on failure.
    pub fn inserting_sections(&self, mut sections: Vec<(usize, Section)>) -> Result<Self, usize> {
        sections.sort_by_key(|(index, _)| *index);
        let mut current = self.sections.clone();
        for (index, section) in sections {
            if index > current.len() {
                return Err(index);
            }
            current.insert(index, section);
        }
        Ok(Self::from_sections(current))
    }
}

fn build_sections(nodes: &[Node], bindings: &mut ListBindings) -> Result<Vec<Section>, ContentError> {
    let mut sections = Vec::new();
    for (position, node) in nodes.iter().enumerate() {
        match node {
            Node::Section(section) => {
                let index = sections.len();
                sections.push(build_section(index, section.content(), bindings)?);
            }
            Node::ForEachSections(each) => {
                bindings.watch(each.listener());
                for section in each.items() {
                    let index = sections.len();
                    sections.push(build_section(index, section.content(), bindings)?);
                }
            }
            other => {
                return Err(ContentError::MixedContent {
                    position,
                    found: other.kind_name(),
                });
            }
        }
    }
    Ok(sections)
}

fn build_section(
    index: usize,
    nodes: &[Node],
    bindings: &mut ListBindings,
) -> Result<Section, ContentError> {
    let last = nodes.len().saturating_sub(1);
    let mut header = None;
    let mut footer = None;
    let mut rows = Vec::new();

    for (position, node) in nodes.iter().enumerate() {
        match node {
            Node::Header(row) if position == 0 => header = Some(Row::header(index, row)),
            Node::Header(_) => {
                return Err(ContentError::MisplacedHeader {
                    section: index,
                    position,
                });
            }
            Node::Footer(row) if position == last => footer = Some(Row::footer(index, row)),
            Node::Footer(_) => {
                return Err(ContentError::MisplacedFooter {
                    section: index,
                    position,
                });
            }
            Node::Row(row) => rows.push(Row::row(IndexPath::new(index, rows.len()), row)),
            Node::ForEachRows(each) => {
                bindings.watch(each.listener());
                for row in each.items() {
                    rows.push(Row::row(IndexPath::new(index, rows.len()), &row));
                }
            }
            Node::Section(_) | Node::ForEachSections(_) => {
                return Err(ContentError::NestedSection {
                    section: index,
                    position,
                    found: node.kind_name(),
                });
            }
        }
    }

    Ok(Section {
        index,
        header,
        footer,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SectionNode;
    use crate::foreach::ForEach;
    use horizon_trellis_core::{Value, ViewKind};
    use parking_lot::Mutex;

    fn native() -> impl Fn(&mut Scene) -> ViewId + Send + Sync + 'static {
        |scene: &mut Scene| scene.create_view(ViewKind::Native)
    }

    fn paths(section: &Section) -> Vec<IndexPath> {
        section.rows().iter().filter_map(Row::index_path).collect()
    }

    #[test]
    fn test_path_delta_for_rows() {
        let at = IndexPath::new;
        let inserted = PathDelta::InsertRows([at(0, 0), at(0, 2), at(1, 0)].into_iter().collect());
        assert_eq!(inserted.map(SizeKind::Row, at(0, 0)), Some(at(0, 1)));
        assert_eq!(inserted.map(SizeKind::Row, at(0, 1)), Some(at(0, 3)));
        assert_eq!(inserted.map(SizeKind::Row, at(0, 5)), Some(at(0, 7)));
        assert_eq!(inserted.map(SizeKind::Row, at(2, 0)), Some(at(2, 0)));
        assert_eq!(inserted.map(SizeKind::Header, at(0, 0)), Some(at(0, 0)));

        let deleted = PathDelta::DeleteRows([at(0, 0), at(0, 2)].into_iter().collect());
        assert_eq!(deleted.map(SizeKind::Row, at(0, 0)), None);
        assert_eq!(deleted.map(SizeKind::Row, at(0, 1)), Some(at(0, 0)));
        assert_eq!(deleted.map(SizeKind::Row, at(0, 3)), Some(at(0, 1)));
        assert_eq!(deleted.map(SizeKind::Row, at(1, 3)), Some(at(1, 3)));
        assert_eq!(deleted.map(SizeKind::Footer, at(0, 0)), Some(at(0, 0)));
    }

    #[test]
    fn test_path_delta_for_sections() {
        let at = IndexPath::new;
        let inserted = PathDelta::InsertSections([0, 2].into_iter().collect());
        assert_eq!(inserted.map(SizeKind::Row, at(0, 4)), Some(at(1, 4)));
        assert_eq!(inserted.map(SizeKind::Header, at(1, 0)), Some(at(3, 0)));

        let deleted = PathDelta::DeleteSections([1].into_iter().collect());
        assert_eq!(deleted.map(SizeKind::Row, at(0, 2)), Some(at(0, 2)));
        assert_eq!(deleted.map(SizeKind::Header, at(1, 0)), None);
        assert_eq!(deleted.map(SizeKind::Row, at(2, 1)), Some(at(1, 1)));
    }

    #[test]
    fn test_row_shaped_content_is_one_section() {
        let list = List::new(&[
            Node::header(native()),
            Node::row(native()),
            Node::row(native()),
            Node::footer(native()),
        ])
        .unwrap();

        assert_eq!(list.section_count(), 1);
        let section = list.section(0).unwrap();
        assert!(section.header().is_some());
        assert!(section.footer().is_some());
        assert_eq!(paths(section), vec![IndexPath::new(0, 0), IndexPath::new(0, 1)]);
    }

    #[test]
    fn test_empty_content_is_one_empty_section() {
        let list = List::new(&[]).unwrap();
        assert_eq!(list.section_count(), 1);
        assert_eq!(list.section(0).unwrap().row_count(), 0);
    }

    #[test]
    fn test_sections_are_numbered_in_order() {
        let list = List::new(&[
            Node::section(vec![Node::row(native())]),
            Node::section(vec![Node::header(native()), Node::row(native()), Node::row(native())]),
        ])
        .unwrap();

        assert_eq!(list.section_count(), 2);
        assert_eq!(paths(list.section(1).unwrap()), vec![IndexPath::new(1, 0), IndexPath::new(1, 1)]);
        assert_eq!(list.section(1).unwrap().header().unwrap().section(), 1);
    }

    #[test]
    fn test_mixed_content_is_rejected() {
        let err = List::new(&[Node::section(vec![]), Node::row(native())]).unwrap_err();
        assert_eq!(
            err,
            ContentError::MixedContent {
                position: 1,
                found: "row"
            }
        );
    }

    #[test]
    fn test_nested_section_is_rejected() {
        let err = List::new(&[Node::section(vec![Node::row(native()), Node::section(vec![])])])
            .unwrap_err();
        assert_eq!(
            err,
            ContentError::NestedSection {
                section: 0,
                position: 1,
                found: "section"
            }
        );
    }

    #[test]
    fn test_misplaced_header_and_footer() {
        let err = List::new(&[Node::row(native()), Node::header(native())]).unwrap_err();
        assert_eq!(err, ContentError::MisplacedHeader { section: 0, position: 1 });

        let err = List::new(&[Node::footer(native()), Node::row(native())]).unwrap_err();
        assert_eq!(err, ContentError::MisplacedFooter { section: 0, position: 0 });
    }

    #[test]
    fn test_for_each_rows_continue_offsets() {
        let source = Value::new(vec![1, 2, 3]);
        let each = ForEach::new(&source, |_: &i32| RowNode::new(native()));
        let list = List::new(&[Node::row(native()), Node::ForEachRows(each), Node::row(native())])
            .unwrap();

        let section = list.section(0).unwrap();
        assert_eq!(section.row_count(), 5);
        assert_eq!(
            paths(section),
            (0..5).map(|r| IndexPath::new(0, r)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_for_each_sections_expand() {
        let source = Value::new(vec![2usize, 0, 1]);
        let each = ForEach::new(&source, |rows: &usize| {
            SectionNode::new((0..*rows).map(|_| Node::row(native())).collect())
        });
        let list = List::new(&[Node::section(vec![]), Node::ForEachSections(each)]).unwrap();

        assert_eq!(list.section_count(), 4);
        let counts: Vec<usize> = list.sections().iter().map(Section::row_count).collect();
        assert_eq!(counts, vec![0, 2, 0, 1]);
        assert_eq!(list.section(3).unwrap().index(), 3);
    }

    #[test]
    fn test_bindings_fire_on_dynamic_change() {
        let source = Value::new(vec![1]);
        let each = ForEach::new(&source, |_: &i32| RowNode::new(native()));
        let fired = Arc::new(Mutex::new(0));

        let f = fired.clone();
        let mut bindings = ListBindings::with_rebuild(move || *f.lock() += 1);
        let _list = List::build(&[Node::ForEachRows(each)], &mut bindings).unwrap();
        assert_eq!(bindings.len(), 1);

        source.set(vec![1, 2]);
        assert_eq!(*fired.lock(), 1);

        drop(bindings);
        source.set(vec![]);
        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn test_removing_and_inserting_rows_renumbers() {
        let list = List::new(&[Node::row(native()), Node::row(native()), Node::row(native())])
            .unwrap();

        let removed = list.removing_rows(&BTreeSet::from([IndexPath::new(0, 1)]));
        assert_eq!(paths(&removed.sections()[0]), vec![IndexPath::new(0, 0), IndexPath::new(0, 1)]);

        let row = Row::row(IndexPath::default(), &RowNode::new(native()));
        let inserted = list.inserting_rows(vec![(IndexPath::new(0, 3), row.clone())]).unwrap();
        assert_eq!(inserted.sections()[0].row_count(), 4);

        let err = list.inserting_rows(vec![(IndexPath::new(0, 9), row.clone())]).unwrap_err();
        assert_eq!(err, IndexPath::new(0, 9));
        let err = list.inserting_rows(vec![(IndexPath::new(2, 0), row)]).unwrap_err();
        assert_eq!(err.section, 2);
    }

    #[test]
    fn test_section_edits_renumber() {
        let list = List::new(&[
            Node::section(vec![Node::row(native())]),
            Node::section(vec![Node::row(native())]),
        ])
        .unwrap();

        let removed = list.removing_sections(&BTreeSet::from([0]));
        assert_eq!(removed.section_count(), 1);
        assert_eq!(removed.sections()[0].index(), 0);
        assert_eq!(paths(&removed.sections()[0]), vec![IndexPath::new(0, 0)]);

        let inserted = list
            .inserting_sections(vec![(0, Section::default())])
            .unwrap();
        assert_eq!(inserted.section_count(), 3);
        assert_eq!(paths(&inserted.sections()[2]), vec![IndexPath::new(2, 0)]);
        assert_eq!(list.inserting_sections(vec![(5, Section::default())]).unwrap_err(), 5);
    }

    #[test]
    fn test_sizing_key_for_header() {
        let list = List::new(&[Node::section(vec![]), Node::section(vec![Node::header(native())])])
            .unwrap();
        let header = list.section(1).unwrap().header().unwrap();
        assert_eq!(header.sizing_key(), (SizeKind::Header, IndexPath::new(1, 0)));
        assert_eq!(header.accessory(), AccessoryType::None);
    }
}
