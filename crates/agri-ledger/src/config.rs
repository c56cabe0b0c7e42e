//! # Ledger Configuration
//!
//! Engine parameters, loadable from YAML. Every field has a default, so an
//! empty document yields [`LedgerConfig::default`]. Unknown keys are
//! rejected to catch typos in deployed configuration.
//!
//! ```yaml
//! starting_reputation: 100
//! administrators: [registry-admin]
//! quality_assessor_roles: [INTERMEDIARY, DISTRIBUTOR]
//! note_separator: " | "
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use agri_core::{Principal, Role};

/// Reputation assigned to a participant at registration.
pub const DEFAULT_STARTING_REPUTATION: u32 = 100;

/// Separator used when rendering batch notes as one string.
pub const DEFAULT_NOTE_SEPARATOR: &str = " | ";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The document is not a valid configuration.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Reputation given to newly registered participants.
    pub starting_reputation: u32,
    /// Principals holding the administrative capability
    /// (reputation updates and deactivation).
    pub administrators: BTreeSet<Principal>,
    /// Roles allowed to update the quality grade of batches they do not own.
    pub quality_assessor_roles: BTreeSet<Role>,
    /// Separator for [`crate::Batch::notes_text`].
    pub note_separator: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_reputation: DEFAULT_STARTING_REPUTATION,
            administrators: BTreeSet::new(),
            quality_assessor_roles: [Role::Intermediary, Role::Distributor].into_iter().collect(),
            note_separator: DEFAULT_NOTE_SEPARATOR.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Parse a configuration from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Builder-style helper to grant the administrative capability.
    pub fn with_administrator(mut self, principal: Principal) -> Self {
        self.administrators.insert(principal);
        self
    }

    /// Whether `principal` holds the administrative capability.
    pub fn is_administrator(&self, principal: &Principal) -> bool {
        self.administrators.contains(principal)
    }

    /// Whether holders of `role` may update quality on batches they do not own.
    pub fn can_assess_quality(&self, role: Role) -> bool {
        self.quality_assessor_roles.contains(&role)
    }
}
