//! The list engine behind a native table.
//!
//! [`UicList`] binds declared content to a [`TableHost`]. It answers the
//! table's data-source queries from the current [`ListState`], materializes
//! rows into [`ReusableCell`]s and drives animated structural changes.
//!
//! # Batches
//!
//! A structural mutation (`insert_rows`, `delete_rows`, `insert_sections`,
//! `delete_sections`) stages the state, hands the change to the host and
//! returns a [`BatchId`]. Until the host reports the batch complete through
//! [`UicList::complete_batch`], the state stays staged and further structural
//! mutations are refused with [`ListError::StateMismatch`]. Completing the
//! batch always restores the canonical state.
//!
//! # Dynamic content
//!
//! For-each entries are watched while the list is alive. When one of them
//! changes, the list is rebuilt from the declared content and the table is
//! reloaded. A change arriving during a batch is applied once the batch
//! completes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use horizon_trellis_core::{Scene, ThreadAffinity, ViewId, ViewKind};
use parking_lot::Mutex;

use crate::cell::{CellAxis, ReusableCell, SizeKind};
use crate::content::{AccessoryType, ActionEdge, Node, RowAction, RowNode, SectionNode};
use crate::error::{ListError, Result};
use crate::host::{BatchId, RowAnimation, TableHost, TableUpdate};
use crate::model::{IndexPath, List, ListBindings, PathDelta, Row, Section};
use crate::options::ListOptions;
use crate::sizing::{HeightCache, TableLink};
use crate::state::ListState;
use crate::targets;

// ============================================================================
// ListSupport
// ============================================================================

struct PendingBatch {
    id: BatchId,
    canonical: ListState,
    /// Applied to measured heights once the canonical state is restored.
    resize: Option<PathDelta>,
}

/// Shared state of a [`UicList`].
///
/// Owned through `Arc<Mutex<_>>`; action handlers and sizing feedback only
/// ever hold it weakly.
pub struct ListSupport {
    this: Weak<Mutex<ListSupport>>,
    state: ListState,
    pending: Option<PendingBatch>,
    deferred_rebuild: bool,
    nodes: Vec<Node>,
    bindings: ListBindings,
    host: Box<dyn TableHost>,
    options: ListOptions,
    cache: HeightCache,
    refresh_scheduled: bool,
    cells: HashMap<(SizeKind, IndexPath), ReusableCell>,
    pool: Vec<ReusableCell>,
    retired: Vec<ReusableCell>,
    affinity: ThreadAffinity,
}

impl ListSupport {
    fn new(
        this: Weak<Mutex<ListSupport>>,
        nodes: Vec<Node>,
        host: Box<dyn TableHost>,
        options: ListOptions,
    ) -> Self {
        Self {
            this,
            state: ListState::default(),
            pending: None,
            deferred_rebuild: false,
            nodes,
            bindings: ListBindings::new(),
            host,
            options,
            cache: HeightCache::new(),
            refresh_scheduled: false,
            cells: HashMap::new(),
            pool: Vec::new(),
            retired: Vec::new(),
            affinity: ThreadAffinity::current(),
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn options(&self) -> &ListOptions {
        &self.options
    }

    pub fn height_cache(&self) -> &HeightCache {
        &self.cache
    }

    /// The batch in flight, if any.
    pub fn pending_batch(&self) -> Option<BatchId> {
        self.pending.as_ref().map(|p| p.id)
    }

    // ------------------------------------------------------------------------
    // Rebuild
    // ------------------------------------------------------------------------

    /// Rebuild from the declared content, or defer until the batch in flight
    /// completes.
    pub(crate) fn rebuild(&mut self) -> Result<()> {
        self.affinity
            .debug_assert_same_thread_with_msg("ListSupport::rebuild");
        if let Some(pending) = &self.pending {
            tracing::debug!(target: targets::LIST, batch = %pending.id, "deferring rebuild until batch completes");
            self.deferred_rebuild = true;
            return Ok(());
        }
        self.rebuild_now()
    }

    fn rebuild_now(&mut self) -> Result<()> {
        let this = self.this.clone();
        let mut bindings = ListBindings::with_rebuild(move || {
            let Some(support) = this.upgrade() else {
                return;
            };
            if let Err(err) = support.lock().rebuild() {
                tracing::warn!(target: targets::LIST, error = %err, "dynamic content produced an invalid list");
            }
        });
        let list = List::build(&self.nodes, &mut bindings)?;

        tracing::debug!(
            target: targets::LIST,
            sections = list.section_count(),
            watched = bindings.len(),
            "rebuilt list"
        );
        self.state = ListState::canonical(list);
        self.bindings = bindings;
        self.cache.clear();
        let shown: Vec<_> = self.cells.drain().map(|(_, cell)| cell).collect();
        self.retire(shown);
        self.host.reload_data();
        Ok(())
    }

    fn reload(&mut self, nodes: Vec<Node>) -> Result<()> {
        self.ensure_canonical("reload")?;
        self.nodes = nodes;
        self.rebuild_now()
    }

    // ------------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------------

    fn ensure_canonical(&self, operation: &'static str) -> Result<()> {
        self.affinity.debug_assert_same_thread_with_msg(operation);
        match &self.pending {
            Some(pending) => {
                tracing::warn!(
                    target: targets::LIST,
                    operation,
                    batch = %pending.id,
                    "list state is staged, abandoning structural mutation"
                );
                Err(ListError::StateMismatch { batch: pending.id })
            }
            None => Ok(()),
        }
    }

    fn start_batch(
        &mut self,
        staged: ListState,
        canonical: ListState,
        update: TableUpdate,
        delta: PathDelta,
    ) -> BatchId {
        let id = BatchId::next();
        tracing::debug!(target: targets::LIST, batch = %id, ?update, "starting batch");
        self.state = staged;
        // The table addresses cells by their final paths from now on.
        self.remap_cells(&delta);

        // Staged insertions already expose the final list; staged deletions
        // keep the old one until the batch completes.
        let resize = match delta {
            PathDelta::InsertRows(_) | PathDelta::InsertSections(_) => {
                self.remap_heights(&delta);
                None
            }
            PathDelta::DeleteRows(_) | PathDelta::DeleteSections(_) => Some(delta),
        };
        self.pending = Some(PendingBatch {
            id,
            canonical,
            resize,
        });
        self.host.apply(&update, id);
        id
    }

    fn remap_cells(&mut self, delta: &PathDelta) {
        let mut gone = Vec::new();
        for ((kind, path), cell) in std::mem::take(&mut self.cells) {
            match delta.map(kind, path) {
                Some(moved) => {
                    self.cells.insert((kind, moved), cell);
                }
                None => gone.push(cell),
            }
        }
        self.retire(gone);
    }

    fn remap_heights(&mut self, delta: &PathDelta) {
        self.cache.remap(delta);
        for cell in self.cells.values() {
            cell.retarget(delta);
        }
    }

    /// Cells no longer addressed by the table. They are hidden and pooled the
    /// next time a scene is at hand.
    fn retire(&mut self, cells: Vec<ReusableCell>) {
        if cells.is_empty() {
            return;
        }
        tracing::trace!(target: targets::LIST, cells = cells.len(), "retiring cells");
        for cell in &cells {
            cell.disarm();
        }
        self.retired.extend(cells);
    }

    fn animation(&self, animation: Option<RowAnimation>) -> RowAnimation {
        animation.unwrap_or(self.options.default_animation)
    }

    fn insert_rows(
        &mut self,
        rows: Vec<(IndexPath, RowNode)>,
        animation: Option<RowAnimation>,
    ) -> Result<BatchId> {
        self.ensure_canonical("insert_rows")?;
        let mut paths: Vec<IndexPath> = rows.iter().map(|(path, _)| *path).collect();
        paths.sort();

        let rows = rows
            .iter()
            .map(|(path, node)| (*path, Row::row(*path, node)))
            .collect();
        let list = self
            .state
            .list()
            .inserting_rows(rows)
            .map_err(ListError::RowOutOfRange)?;

        let staged = ListState::staged(list.clone(), BTreeSet::new(), BTreeSet::new());
        let delta = PathDelta::InsertRows(paths.iter().copied().collect());
        let update = TableUpdate::InsertRows {
            paths,
            animation: self.animation(animation),
        };
        Ok(self.start_batch(staged, ListState::canonical(list), update, delta))
    }

    fn delete_rows(&mut self, paths: Vec<IndexPath>, animation: Option<RowAnimation>) -> Result<BatchId> {
        self.ensure_canonical("delete_rows")?;
        if let Some(missing) = paths.iter().find(|p| !self.state.list().contains_row(**p)) {
            return Err(ListError::RowOutOfRange(*missing));
        }

        let hidden: BTreeSet<IndexPath> = paths.into_iter().collect();
        let list = self.state.list();
        let canonical = ListState::canonical(list.removing_rows(&hidden));
        let staged = ListState::staged(list.clone(), hidden.clone(), BTreeSet::new());
        let update = TableUpdate::DeleteRows {
            paths: hidden.iter().copied().collect(),
            animation: self.animation(animation),
        };
        Ok(self.start_batch(staged, canonical, update, PathDelta::DeleteRows(hidden)))
    }

    fn insert_sections(
        &mut self,
        sections: Vec<(usize, SectionNode)>,
        animation: Option<RowAnimation>,
    ) -> Result<BatchId> {
        self.ensure_canonical("insert_sections")?;
        let mut indices: Vec<usize> = sections.iter().map(|(index, _)| *index).collect();
        indices.sort_unstable();

        let mut built = Vec::with_capacity(sections.len());
        for (index, node) in &sections {
            built.push((*index, Section::build(*index, node.content(), &mut ListBindings::new())?));
        }
        let list = self
            .state
            .list()
            .inserting_sections(built)
            .map_err(ListError::SectionOutOfRange)?;

        let staged = ListState::staged(list.clone(), BTreeSet::new(), BTreeSet::new());
        let delta = PathDelta::InsertSections(indices.iter().copied().collect());
        let update = TableUpdate::InsertSections {
            indices,
            animation: self.animation(animation),
        };
        Ok(self.start_batch(staged, ListState::canonical(list), update, delta))
    }

    fn delete_sections(&mut self, indices: Vec<usize>, animation: Option<RowAnimation>) -> Result<BatchId> {
        self.ensure_canonical("delete_sections")?;
        let count = self.state.list().section_count();
        if let Some(missing) = indices.iter().find(|i| **i >= count) {
            return Err(ListError::SectionOutOfRange(*missing));
        }

        let hidden: BTreeSet<usize> = indices.into_iter().collect();
        let list = self.state.list();
        let canonical = ListState::canonical(list.removing_sections(&hidden));
        let staged = ListState::staged(list.clone(), BTreeSet::new(), hidden.clone());
        let update = TableUpdate::DeleteSections {
            indices: hidden.iter().copied().collect(),
            animation: self.animation(animation),
        };
        Ok(self.start_batch(staged, canonical, update, PathDelta::DeleteSections(hidden)))
    }

    fn complete_batch(&mut self, batch: BatchId) -> Result<()> {
        let pending = match self.pending.take() {
            Some(pending) if pending.id == batch => pending,
            other => {
                self.pending = other;
                return Err(ListError::UnknownBatch(batch));
            }
        };

        tracing::debug!(target: targets::LIST, %batch, "batch completed, restoring canonical state");
        self.state = pending.canonical;
        if let Some(delta) = &pending.resize {
            self.remap_heights(delta);
        }

        if std::mem::take(&mut self.deferred_rebuild) {
            self.rebuild_now()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Sizing
    // ------------------------------------------------------------------------

    /// Cache a measured height. Returns whether a refresh must be posted.
    pub(crate) fn record_height(&mut self, kind: SizeKind, index_path: IndexPath, height: f32) -> bool {
        if !self.cache.update(kind, index_path, height) {
            return false;
        }
        !std::mem::replace(&mut self.refresh_scheduled, true)
    }

    pub(crate) fn run_height_refresh(&mut self) {
        self.refresh_scheduled = false;
        self.host.refresh_layout();
    }

    fn height(&self, row: Option<&Row>, estimate: f32) -> f32 {
        row.and_then(|row| {
            let (kind, path) = row.sizing_key();
            self.cache.get(kind, path)
        })
        .unwrap_or(estimate)
    }

    fn row(&self, index_path: IndexPath) -> Result<&Row> {
        self.state
            .row(index_path)
            .ok_or(ListError::RowOutOfRange(index_path))
    }
}

impl fmt::Debug for ListSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSupport")
            .field("sections", &self.state.number_of_sections())
            .field("staged", &self.state.is_staged())
            .field("pending", &self.pending_batch())
            .field("cells", &self.cells.len())
            .field("pooled", &self.pool.len())
            .field("retired", &self.retired.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// UicList
// ============================================================================

/// Passed to row action handlers.
#[derive(Debug, Clone)]
pub struct ActionContext {
    list: WeakList,
    index_path: IndexPath,
    edge: ActionEdge,
}

impl ActionContext {
    /// The list the action was triggered on. Does not keep it alive.
    pub fn list(&self) -> &WeakList {
        &self.list
    }

    pub fn index_path(&self) -> IndexPath {
        self.index_path
    }

    pub fn edge(&self) -> ActionEdge {
        self.edge
    }
}

/// A declarative list bound to a native table.
#[derive(Clone)]
pub struct UicList {
    table: ViewId,
    support: Arc<Mutex<ListSupport>>,
}

/// A non-owning handle to a [`UicList`].
#[derive(Clone)]
pub struct WeakList {
    table: ViewId,
    support: Weak<Mutex<ListSupport>>,
}

impl WeakList {
    pub fn upgrade(&self) -> Option<UicList> {
        Some(UicList {
            table: self.table,
            support: self.support.upgrade()?,
        })
    }

    /// Like [`upgrade`](Self::upgrade), for callers that propagate errors.
    ///
    /// # Errors
    ///
    /// [`ListError::Released`] once the list has been dropped.
    pub fn try_upgrade(&self) -> Result<UicList> {
        self.upgrade().ok_or(ListError::Released)
    }

    pub fn table(&self) -> ViewId {
        self.table
    }
}

impl fmt::Debug for WeakList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakList")
            .field("table", &self.table)
            .field("alive", &(self.support.strong_count() > 0))
            .finish()
    }
}

impl UicList {
    /// Create a table view for `nodes` and load it into `host`.
    ///
    /// # Errors
    ///
    /// Fails if the content is malformed; the table view is discarded.
    pub fn new<H>(scene: &mut Scene, nodes: Vec<Node>, host: H, options: ListOptions) -> Result<Self>
    where
        H: TableHost + 'static,
    {
        let table = scene.create_named_view(ViewKind::Native, "table");
        let support = Arc::new_cyclic(|this| {
            Mutex::new(ListSupport::new(this.clone(), nodes, Box::new(host), options))
        });
        scene.set_payload(table, TableLink(Arc::downgrade(&support)))?;

        let loaded = support.lock().rebuild_now();
        if let Err(err) = loaded {
            let _ = scene.destroy_view(table);
            return Err(err);
        }

        tracing::debug!(target: targets::LIST, ?table, "created list");
        Ok(Self { table, support })
    }

    /// The native table view. Cell containers are attached to it.
    pub fn table(&self) -> ViewId {
        self.table
    }

    pub fn downgrade(&self) -> WeakList {
        WeakList {
            table: self.table,
            support: Arc::downgrade(&self.support),
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> ListState {
        self.support.lock().state.clone()
    }

    pub fn options(&self) -> ListOptions {
        self.support.lock().options.clone()
    }

    pub fn is_staged(&self) -> bool {
        self.support.lock().state.is_staged()
    }

    pub fn pending_batch(&self) -> Option<BatchId> {
        self.support.lock().pending_batch()
    }

    /// Run `f` with the shared list state locked.
    pub fn with_support<R>(&self, f: impl FnOnce(&ListSupport) -> R) -> R {
        f(&self.support.lock())
    }

    // ------------------------------------------------------------------------
    // Data source
    // ------------------------------------------------------------------------

    pub fn number_of_sections(&self) -> usize {
        self.support.lock().state.number_of_sections()
    }

    pub fn number_of_rows(&self, section: usize) -> usize {
        self.support.lock().state.number_of_rows(section)
    }

    /// Materialize the row at `index_path` and return its cell container.
    pub fn cell_for_row(&self, scene: &mut Scene, index_path: IndexPath) -> Result<ViewId> {
        let row = self.support.lock().row(index_path)?.clone();
        self.dequeue(scene, (SizeKind::Row, index_path), row)
    }

    /// Materialize the header of `section`, if it has one.
    pub fn header_view(&self, scene: &mut Scene, section: usize) -> Result<Option<ViewId>> {
        let Some(row) = self.support.lock().state.header(section).cloned() else {
            return Ok(None);
        };
        self.dequeue(scene, (SizeKind::Header, IndexPath::new(section, 0)), row)
            .map(Some)
    }

    /// Materialize the footer of `section`, if it has one.
    pub fn footer_view(&self, scene: &mut Scene, section: usize) -> Result<Option<ViewId>> {
        let Some(row) = self.support.lock().state.footer(section).cloned() else {
            return Ok(None);
        };
        self.dequeue(scene, (SizeKind::Footer, IndexPath::new(section, 0)), row)
            .map(Some)
    }

    fn dequeue(&self, scene: &mut Scene, key: (SizeKind, IndexPath), row: Row) -> Result<ViewId> {
        self.recycle_retired_cells(scene);
        let (reused, axis, style) = {
            let mut support = self.support.lock();
            let reused = support.cells.remove(&key).or_else(|| support.pool.pop());
            (reused, support.options.cell_axis, support.options.cell_style)
        };

        let mut cell = match reused {
            Some(cell) if scene.contains(cell.container()) => cell,
            _ => ReusableCell::new(scene, style),
        };
        let container = cell.container();

        // Content builders and layout handlers run unlocked.
        let bound = self.bind(scene, &mut cell, row, axis);
        self.support.lock().cells.insert(key, cell);
        bound.map(|()| container)
    }

    fn bind(&self, scene: &mut Scene, cell: &mut ReusableCell, row: Row, axis: CellAxis) -> Result<()> {
        let container = cell.container();
        if scene.superview(container)? != Some(self.table) {
            scene.add_subview(self.table, container)?;
        }
        scene.set_hidden(container, false)?;
        cell.prepare(scene, row, axis)?;
        Ok(())
    }

    /// Return the cell shown for `kind` at `index_path` to the reuse pool.
    pub fn did_end_displaying(&self, scene: &mut Scene, kind: SizeKind, index_path: IndexPath) {
        self.recycle_retired_cells(scene);
        let Some(cell) = self.support.lock().cells.remove(&(kind, index_path)) else {
            return;
        };
        cell.disarm();
        // Hiding runs appearance handlers; keep the list unlocked.
        let _ = scene.set_hidden(cell.container(), true);
        self.support.lock().pool.push(cell);
    }

    /// Hide the cells left behind by batches and rebuilds and return them to
    /// the reuse pool. Returns how many were recycled.
    ///
    /// Dequeuing a cell does this first, so hosts only need to call it when
    /// they want stale cells off screen before the table asks for views again.
    pub fn recycle_retired_cells(&self, scene: &mut Scene) -> usize {
        let retired = std::mem::take(&mut self.support.lock().retired);
        if retired.is_empty() {
            return 0;
        }
        let count = retired.len();
        let mut recycled = Vec::with_capacity(count);
        for cell in retired {
            if scene.set_hidden(cell.container(), true).is_ok() {
                recycled.push(cell);
            }
        }
        tracing::trace!(target: targets::LIST, count, "recycled retired cells");
        self.support.lock().pool.extend(recycled);
        count
    }

    // ------------------------------------------------------------------------
    // Delegate
    // ------------------------------------------------------------------------

    /// Measured height of the row, or the estimate.
    pub fn height_for_row(&self, index_path: IndexPath) -> f32 {
        let support = self.support.lock();
        support.height(support.state.row(index_path), support.options.estimated_row_height)
    }

    pub fn height_for_header(&self, section: usize) -> f32 {
        let support = self.support.lock();
        support.height(support.state.header(section), support.options.estimated_header_height)
    }

    pub fn height_for_footer(&self, section: usize) -> f32 {
        let support = self.support.lock();
        support.height(support.state.footer(section), support.options.estimated_footer_height)
    }

    pub fn trailing_actions(&self, index_path: IndexPath) -> Result<Vec<RowAction>> {
        Ok(self.support.lock().row(index_path)?.trailing_actions().to_vec())
    }

    pub fn leading_actions(&self, index_path: IndexPath) -> Result<Vec<RowAction>> {
        Ok(self.support.lock().row(index_path)?.leading_actions().to_vec())
    }

    pub fn accessory(&self, index_path: IndexPath) -> Result<AccessoryType> {
        Ok(self.support.lock().row(index_path)?.accessory())
    }

    /// Trigger the `index`-th action revealed from `edge` on a row.
    ///
    /// The handler runs with the list unlocked and may mutate it.
    pub fn perform_action(
        &self,
        scene: &mut Scene,
        index_path: IndexPath,
        edge: ActionEdge,
        index: usize,
    ) -> Result<()> {
        let handler = {
            let support = self.support.lock();
            let row = support.row(index_path)?;
            let actions = match edge {
                ActionEdge::Leading => row.leading_actions(),
                ActionEdge::Trailing => row.trailing_actions(),
            };
            actions
                .get(index)
                .map(RowAction::handler)
                .ok_or(ListError::ActionOutOfRange {
                    index_path,
                    edge: edge.as_str(),
                    index,
                })?
        };

        tracing::debug!(target: targets::LIST, %index_path, edge = edge.as_str(), index, "performing row action");
        let context = ActionContext {
            list: self.downgrade(),
            index_path,
            edge,
        };
        handler(scene, &context);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Insert rows at their final index paths.
    pub fn insert_rows(
        &self,
        rows: Vec<(IndexPath, RowNode)>,
        animation: Option<RowAnimation>,
    ) -> Result<BatchId> {
        self.support.lock().insert_rows(rows, animation)
    }

    /// Delete the rows at `paths`.
    pub fn delete_rows(&self, paths: Vec<IndexPath>, animation: Option<RowAnimation>) -> Result<BatchId> {
        self.support.lock().delete_rows(paths, animation)
    }

    /// Insert sections at their final indices.
    pub fn insert_sections(
        &self,
        sections: Vec<(usize, SectionNode)>,
        animation: Option<RowAnimation>,
    ) -> Result<BatchId> {
        self.support.lock().insert_sections(sections, animation)
    }

    /// Delete the sections at `indices`.
    pub fn delete_sections(&self, indices: Vec<usize>, animation: Option<RowAnimation>) -> Result<BatchId> {
        self.support.lock().delete_sections(indices, animation)
    }

    /// Called by the host when the animation of `batch` has finished.
    pub fn complete_batch(&self, batch: BatchId) -> Result<()> {
        self.support.lock().complete_batch(batch)
    }

    /// Replace the declared content and reload the table.
    pub fn reload(&self, nodes: Vec<Node>) -> Result<()> {
        self.support.lock().reload(nodes)
    }

    /// Regenerate the list from the declared content.
    pub fn rebuild(&self) -> Result<()> {
        self.support.lock().rebuild()
    }

    /// Ask the host to re-query the given rows.
    pub fn reload_rows(&self, paths: Vec<IndexPath>, animation: Option<RowAnimation>) -> Result<()> {
        let mut support = self.support.lock();
        if let Some(missing) = paths.iter().find(|p| support.state.row(**p).is_none()) {
            return Err(ListError::RowOutOfRange(*missing));
        }
        let animation = support.animation(animation);
        support.host.reload_rows(&paths, animation);
        Ok(())
    }
}

impl fmt::Debug for UicList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UicList")
            .field("table", &self.table)
            .field("support", &*self.support.lock())
            .finish()
    }
}

static_assertions::assert_impl_all!(UicList: Send, Sync);
static_assertions::assert_impl_all!(ListOptions: Send, Sync);
