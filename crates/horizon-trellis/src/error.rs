//! Error types for list construction and mutation.

use horizon_trellis_core::SceneError;

use crate::host::BatchId;
use crate::model::IndexPath;

/// Result type alias for list operations.
pub type Result<T> = std::result::Result<T, ListError>;

/// Declared content that cannot be turned into a list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// Sections and rows were mixed at the top level.
    #[error("Expected a section or for-each of sections at position {position}, found {found}")]
    MixedContent { position: usize, found: &'static str },

    /// A section was declared inside another section.
    #[error("Section {section} contains a nested {found} at position {position}")]
    NestedSection {
        section: usize,
        position: usize,
        found: &'static str,
    },

    /// A header appeared somewhere other than the first position.
    #[error("Header of section {section} must come first, found at position {position}")]
    MisplacedHeader { section: usize, position: usize },

    /// A footer appeared somewhere other than the last position.
    #[error("Footer of section {section} must come last, found at position {position}")]
    MisplacedFooter { section: usize, position: usize },
}

/// Errors reported by the list engine.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// The declared content is malformed.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// A structural mutation was requested while a batch is in flight.
    #[error("List state is staged by batch {batch}; structural mutations need the canonical state")]
    StateMismatch { batch: BatchId },

    /// No batch with this id is in flight.
    #[error("Batch {0} is not in flight")]
    UnknownBatch(BatchId),

    /// The index path does not address a row.
    #[error("No row at {0}")]
    RowOutOfRange(IndexPath),

    /// The section index does not address a section.
    #[error("No section at index {0}")]
    SectionOutOfRange(usize),

    /// The row has no action at the requested position.
    #[error("Row {index_path} has no {edge} action at index {index}")]
    ActionOutOfRange {
        index_path: IndexPath,
        edge: &'static str,
        index: usize,
    },

    /// The list engine has been dropped.
    #[error("List has been released")]
    Released,

    /// The view arena rejected an operation.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// List options could not be parsed.
    #[error("Invalid list options: {0}")]
    Options(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ContentError::MisplacedFooter { section: 2, position: 0 };
        assert_eq!(
            err.to_string(),
            "Footer of section 2 must come last, found at position 0"
        );

        let err = ListError::from(err);
        assert!(matches!(err, ListError::Content(_)));

        let err = ListError::RowOutOfRange(IndexPath::new(1, 3));
        assert_eq!(err.to_string(), "No row at (section 1, row 3)");
    }
}
