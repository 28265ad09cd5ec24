//! Table editing settings and their persistence
//!
//! Settings are stored as pretty-printed JSON. A missing file yields the
//! defaults; an unreadable one logs a warning and also yields the defaults.

use crate::{PixelPercent, Result, TableCreationParameters, TableLimits, TableProperties};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name used under the settings directory
pub const SETTINGS_FILE_NAME: &str = "table_editing.json";

/// All table editing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableEditingSettings {
    /// Parameters offered when creating a new table
    pub defaults: TableCreationDefaults,
    /// Column resize behavior
    pub sizing: SizingSettings,
    /// Runtime border drawn around tables that have none
    pub design_time_border: DesignTimeBorder,
    /// Markup placed in empty cells to keep them from collapsing
    pub empty_cell_placeholder: String,
    /// Classes marking regions whose tables must never be edited
    pub smart_content_classes: Vec<String>,
    /// Validation bounds for new tables
    pub limits: TableLimits,
}

impl Default for TableEditingSettings {
    fn default() -> Self {
        Self {
            defaults: TableCreationDefaults::default(),
            sizing: SizingSettings::default(),
            design_time_border: DesignTimeBorder::default(),
            empty_cell_placeholder: "&nbsp;".to_string(),
            smart_content_classes: vec![
                "wlWriterSmartContent".to_string(),
                "wlWriterEditableSmartContent".to_string(),
            ],
            limits: TableLimits::default(),
        }
    }
}

impl TableEditingSettings {
    /// Whether an element carrying `class_name` starts a smart content region
    pub fn is_smart_content_class(&self, class_name: &str) -> bool {
        self.smart_content_classes.iter().any(|c| c == class_name)
    }
}

/// Remembered parameters for the next table insertion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableCreationDefaults {
    pub rows: usize,
    pub columns: usize,
    pub cell_padding: String,
    pub cell_spacing: String,
    pub border_size: String,
    pub width: PixelPercent,
}

impl Default for TableCreationDefaults {
    fn default() -> Self {
        Self {
            rows: 3,
            columns: 3,
            cell_padding: String::new(),
            cell_spacing: String::new(),
            border_size: String::new(),
            width: PixelPercent::UNDEFINED,
        }
    }
}

impl TableCreationDefaults {
    pub fn parameters(&self) -> TableCreationParameters {
        TableCreationParameters::new(
            self.rows,
            self.columns,
            TableProperties {
                cell_padding: self.cell_padding.clone(),
                cell_spacing: self.cell_spacing.clone(),
                border_size: self.border_size.clone(),
                width: self.width,
            },
        )
    }

    /// Remember the parameters of a table that was just inserted
    pub fn remember(&mut self, parameters: &TableCreationParameters) {
        self.rows = parameters.rows;
        self.columns = parameters.columns;
        self.cell_padding = parameters.properties.cell_padding.clone();
        self.cell_spacing = parameters.properties.cell_spacing.clone();
        self.border_size = parameters.properties.border_size.clone();
        self.width = parameters.properties.width;
    }
}

/// Column resize tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizingSettings {
    /// Narrowest width a drag may leave a column at
    pub minimum_column_width: i32,
    /// Smallest distance from a cell edge that still counts as "on the edge"
    pub minimum_hot_region: i32,
    /// Extra pixels past the table's right edge that still track the mouse
    pub right_edge_slop: i32,
}

impl Default for SizingSettings {
    fn default() -> Self {
        Self {
            minimum_column_width: 10,
            minimum_hot_region: 2,
            right_edge_slop: 4,
        }
    }
}

/// Runtime-only border shown for tables without a real one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DesignTimeBorder {
    pub width: String,
    pub color: String,
    pub style: String,
}

impl Default for DesignTimeBorder {
    fn default() -> Self {
        Self {
            width: "1".to_string(),
            color: "#BCBCBC".to_string(),
            style: "dotted".to_string(),
        }
    }
}

/// Loads and saves [`TableEditingSettings`]
pub struct SettingsManager {
    settings_path: PathBuf,
    current: TableEditingSettings,
}

impl SettingsManager {
    /// Manager for the settings file inside `settings_dir`
    pub fn new(settings_dir: impl AsRef<Path>) -> Self {
        Self {
            settings_path: settings_dir.as_ref().join(SETTINGS_FILE_NAME),
            current: TableEditingSettings::default(),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load from disk, falling back to defaults
    pub fn load(&mut self) -> Result<&TableEditingSettings> {
        if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)?;
            match serde_json::from_str::<TableEditingSettings>(&content) {
                Ok(settings) => {
                    self.current = settings;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse table editing settings, using defaults: {}",
                        e
                    );
                    self.current = TableEditingSettings::default();
                }
            }
        } else {
            self.current = TableEditingSettings::default();
        }
        Ok(&self.current)
    }

    /// Write the current settings to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    pub fn get(&self) -> &TableEditingSettings {
        &self.current
    }

    pub fn update(&mut self, settings: TableEditingSettings) -> Result<()> {
        self.current = settings;
        self.save()
    }

    /// Remember new-table parameters and persist them
    pub fn remember_table_defaults(&mut self, parameters: &TableCreationParameters) -> Result<()> {
        self.current.defaults.remember(parameters);
        self.save()
    }
}
