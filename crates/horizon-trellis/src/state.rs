//! Read-only views over a [`List`].
//!
//! A [`ListState`] answers the table's data-source queries. A *canonical*
//! state shows its list as-is; a *staged* state hides the rows and sections
//! an in-flight animated batch is removing, so counts already match what the
//! table will show once the batch lands.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::content::Node;
use crate::error::ContentError;
use crate::model::{IndexPath, List, ListBindings, Row, Section};

/// A value tagged with a stable string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Identifier<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// Whether a state is canonical or staged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StateKind {
    #[default]
    Canonical,
    Staged {
        hidden_rows: BTreeSet<IndexPath>,
        hidden_sections: BTreeSet<usize>,
    },
}

/// A snapshot of a list as presented to the table.
#[derive(Debug, Clone, Default)]
pub struct ListState {
    list: Arc<List>,
    kind: StateKind,
}

impl ListState {
    /// Build a canonical state from declared content.
    pub fn new(nodes: &[Node]) -> Result<Self, ContentError> {
        Ok(Self::canonical(List::new(nodes)?))
    }

    /// Build a canonical state, watching dynamic entries through `bindings`.
    pub fn build(nodes: &[Node], bindings: &mut ListBindings) -> Result<Self, ContentError> {
        Ok(Self::canonical(List::build(nodes, bindings)?))
    }

    pub fn canonical(list: List) -> Self {
        Self {
            list: Arc::new(list),
            kind: StateKind::Canonical,
        }
    }

    /// A state hiding the given rows and sections of `list`.
    pub fn staged(
        list: List,
        hidden_rows: BTreeSet<IndexPath>,
        hidden_sections: BTreeSet<usize>,
    ) -> Self {
        Self {
            list: Arc::new(list),
            kind: StateKind::Staged {
                hidden_rows,
                hidden_sections,
            },
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self.kind, StateKind::Staged { .. })
    }

    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    /// The underlying list, hidden entries included.
    pub fn list(&self) -> &List {
        &self.list
    }

    fn visible_sections(&self) -> impl Iterator<Item = &Section> {
        self.list.sections().iter().filter(move |section| match &self.kind {
            StateKind::Canonical => true,
            StateKind::Staged {
                hidden_sections, ..
            } => !hidden_sections.contains(&section.index()),
        })
    }

    fn visible_rows<'a>(&'a self, section: &'a Section) -> impl Iterator<Item = &'a Row> {
        section.rows().iter().filter(move |row| match (&self.kind, row.index_path()) {
            (StateKind::Staged { hidden_rows, .. }, Some(path)) => !hidden_rows.contains(&path),
            _ => true,
        })
    }

    pub fn number_of_sections(&self) -> usize {
        self.visible_sections().count()
    }

    /// Number of visible rows in the visible section `section`.
    pub fn number_of_rows(&self, section: usize) -> usize {
        self.section(section)
            .map_or(0, |section| self.visible_rows(section).count())
    }

    /// The visible section at `index`.
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.visible_sections().nth(index)
    }

    /// The row shown at `at`.
    pub fn row(&self, at: IndexPath) -> Option<&Row> {
        let section = self.section(at.section)?;
        self.visible_rows(section).nth(at.row)
    }

    pub fn header(&self, section: usize) -> Option<&Row> {
        self.section(section)?.header()
    }

    pub fn footer(&self, section: usize) -> Option<&Row> {
        self.section(section)?.footer()
    }

    /// Headers keyed `"{section}.header"`.
    pub fn headers(&self) -> Vec<Identifier<String, Row>> {
        self.visible_sections()
            .enumerate()
            .filter_map(|(s, section)| {
                let header = section.header()?;
                Some(Identifier::new(format!("{s}.header"), header.clone()))
            })
            .collect()
    }

    /// Content rows keyed `"{section}.{row}.row"`.
    pub fn rows(&self) -> Vec<Identifier<String, Row>> {
        self.visible_sections()
            .enumerate()
            .flat_map(move |(s, section)| {
                self.visible_rows(section)
                    .enumerate()
                    .map(move |(r, row)| Identifier::new(format!("{s}.{r}.row"), row.clone()))
            })
            .collect()
    }

    /// Footers keyed `"{section}.footer"`.
    pub fn footers(&self) -> Vec<Identifier<String, Row>> {
        self.visible_sections()
            .enumerate()
            .filter_map(|(s, section)| {
                let footer = section.footer()?;
                Some(Identifier::new(format!("{s}.footer"), footer.clone()))
            })
            .collect()
    }
}

static_assertions::assert_impl_all!(ListState: Send, Sync);
static_assertions::assert_impl_all!(Row: Send, Sync);
