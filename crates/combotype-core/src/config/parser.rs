// Combotype Config Parser - TOML with Serde
// Parses trigger groups, matcher policy and device filters from TOML files

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dictionary::{DictionaryError, DictionarySnapshot, MatchMode, TriggerEntry};
use crate::hook::InvalidationPolicy;
use crate::layout::LayoutKind;

/// Default capacity of the match hand-off channel
pub const DEFAULT_DISPATCH_QUEUE: usize = 64;

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid combo in group '{group}': {source}")]
    InvalidCombo {
        group: String,
        #[source]
        source: DictionaryError,
    },

    #[error("dispatch_queue must be at least 1")]
    EmptyDispatchQueue,
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Which events discard the typed-text context
    #[serde(default)]
    pub matcher: InvalidationPolicy,

    /// Device filter configuration
    #[serde(default)]
    pub devices: DevicesConfig,

    /// Trigger groups, in file order
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupConfig>,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Layout used to resolve Linux key codes
    pub layout: LayoutKind,
    /// Capacity of the match hand-off channel
    pub dispatch_queue: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            layout: LayoutKind::default(),
            dispatch_queue: DEFAULT_DISPATCH_QUEUE,
        }
    }
}

/// Device filtering configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Explicit device names/paths to use
    #[serde(default)]
    pub only: Vec<String>,
}

/// A named set of combos that can be switched off together
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    #[serde(default, rename = "combo")]
    pub combos: Vec<ComboConfig>,
}

/// One trigger keyword
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComboConfig {
    pub keyword: String,

    /// Opaque combo reference handed to the dispatcher; defaults to the keyword
    #[serde(default)]
    pub id: Option<String>,

    /// Preceding character must be a word boundary
    #[serde(default)]
    pub word_boundary: bool,

    /// Fire only once a boundary character follows the keyword
    #[serde(default)]
    pub terminator: bool,

    #[serde(default = "enabled_by_default")]
    pub case_sensitive: bool,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl ComboConfig {
    pub fn to_entry(&self) -> TriggerEntry {
        let id = self.id.as_deref().unwrap_or(&self.keyword);
        let mode = MatchMode::anywhere()
            .with_boundary_before(self.word_boundary)
            .with_boundary_after(self.terminator)
            .with_case_sensitive(self.case_sensitive);
        TriggerEntry::new(self.keyword.as_str(), id).with_mode(mode)
    }
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;

        if config.general.dispatch_queue == 0 {
            return Err(ConfigError::EmptyDispatchQueue);
        }

        log::debug!(
            "Parsed config: {} group(s), {} active combo(s)",
            config.groups.len(),
            config.active_combos().count()
        );
        Ok(config)
    }

    /// Get the default config path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("combotype").join("config.toml"))
    }

    fn active_combos(&self) -> impl Iterator<Item = (&GroupConfig, &ComboConfig)> {
        self.groups
            .iter()
            .filter(|group| group.enabled)
            .flat_map(|group| {
                group
                    .combos
                    .iter()
                    .filter(|combo| combo.enabled)
                    .map(move |combo| (group, combo))
            })
    }

    /// Enabled combos of enabled groups, in file order
    pub fn trigger_entries(&self) -> Vec<TriggerEntry> {
        self.active_combos().map(|(_, combo)| combo.to_entry()).collect()
    }

    /// Validate every active combo as the dictionary would.
    ///
    /// Returns the number of entries a rebuild would install.
    pub fn check(&self) -> Result<usize, ConfigError> {
        for (group, combo) in self.active_combos() {
            DictionarySnapshot::build([combo.to_entry()], 0).map_err(|source| {
                ConfigError::InvalidCombo {
                    group: group.name.clone(),
                    source,
                }
            })?;
        }
        Ok(self.active_combos().count())
    }
}
