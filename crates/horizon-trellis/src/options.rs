//! List configuration.
//!
//! [`ListOptions`] can be built in code or read from a host application's
//! TOML settings; missing keys fall back to the defaults.
//!
//! ```
//! use horizon_trellis::{CellAxis, ListOptions, RowAnimation};
//!
//! let options = ListOptions::from_toml_str(
//!     r#"
//!     estimated_row_height = 60.0
//!     default_animation = "fade"
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(options.estimated_row_height, 60.0);
//! assert_eq!(options.default_animation, RowAnimation::Fade);
//! assert_eq!(options.cell_axis, CellAxis::Horizontal);
//! ```

use serde::{Deserialize, Serialize};

use crate::cell::CellAxis;
use crate::error::Result;
use crate::host::RowAnimation;

/// Which native cell flavor hosts the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStyle {
    /// Table view cells.
    #[default]
    TableCell,
    /// Collection view cells.
    CollectionCell,
}

impl CellStyle {
    /// Name given to cell container views.
    pub fn container_name(self) -> &'static str {
        match self {
            CellStyle::TableCell => "table-cell",
            CellStyle::CollectionCell => "collection-cell",
        }
    }
}

/// Tunables of a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    /// Row height reported before a row has been measured.
    pub estimated_row_height: f32,
    /// Header height reported before a header has been measured.
    pub estimated_header_height: f32,
    /// Footer height reported before a footer has been measured.
    pub estimated_footer_height: f32,
    /// Animation for mutations that do not name one.
    pub default_animation: RowAnimation,
    /// How hosted content is aligned inside its cell.
    pub cell_axis: CellAxis,
    pub cell_style: CellStyle,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            estimated_row_height: 44.0,
            estimated_header_height: 28.0,
            estimated_footer_height: 28.0,
            default_animation: RowAnimation::Automatic,
            cell_axis: CellAxis::Horizontal,
            cell_style: CellStyle::TableCell,
        }
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_estimated_row_height(mut self, height: f32) -> Self {
        self.estimated_row_height = height;
        self
    }

    pub fn with_estimated_header_height(mut self, height: f32) -> Self {
        self.estimated_header_height = height;
        self
    }

    pub fn with_estimated_footer_height(mut self, height: f32) -> Self {
        self.estimated_footer_height = height;
        self
    }

    pub fn with_default_animation(mut self, animation: RowAnimation) -> Self {
        self.default_animation = animation;
        self
    }

    pub fn with_cell_axis(mut self, axis: CellAxis) -> Self {
        self.cell_axis = axis;
        self
    }

    pub fn with_cell_style(mut self, style: CellStyle) -> Self {
        self.cell_style = style;
        self
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize the options as a TOML document.
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListError;

    #[test]
    fn test_defaults() {
        let options = ListOptions::default();
        assert_eq!(options.estimated_row_height, 44.0);
        assert_eq!(options.estimated_header_height, 28.0);
        assert_eq!(options.cell_style, CellStyle::TableCell);
        assert_eq!(ListOptions::from_toml_str("").unwrap(), options);
    }

    #[test]
    fn test_builder() {
        let options = ListOptions::new()
            .with_cell_axis(CellAxis::Vertical)
            .with_cell_style(CellStyle::CollectionCell)
            .with_estimated_footer_height(12.0);
        assert_eq!(options.cell_axis, CellAxis::Vertical);
        assert_eq!(options.cell_style.container_name(), "collection-cell");
        assert_eq!(options.estimated_footer_height, 12.0);
    }

    #[test]
    fn test_toml_text_is_readable_back() {
        let options = ListOptions::new()
            .with_default_animation(RowAnimation::Bottom)
            .with_cell_axis(CellAxis::Center);
        let text = options.to_toml_string().unwrap();
        assert!(text.contains("default_animation = \"bottom\""));
        assert!(text.contains("cell_axis = \"center\""));
        assert_eq!(ListOptions::from_toml_str(&text).unwrap(), options);
    }

    #[test]
    fn test_invalid_toml() {
        let err = ListOptions::from_toml_str("cell_axis = \"diagonal\"").unwrap_err();
        assert!(matches!(err, ListError::Options(_)));
    }
}
