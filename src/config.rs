//! Pipeline configuration.
//!
//! Most of the configuration is discovered at connection time (whether the
//! presentation extension is available, which dmabuf formats the compositor
//! advertises); the rest can be loaded from a small TOML file.
//!
//! # Example TOML
//! ```toml
//! # Coalesce connection flushes to the end of the dispatch batch.
//! flush_policy = "deferred"
//!
//! # Formats to accept even if the compositor did not advertise them.
//! extra_formats = [0x34325241]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Whether each scheduled flush is honored eagerly or coalesced until the
/// end of the current dispatch batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Flush the connection as soon as a flush is scheduled.
    #[default]
    Immediate,
    /// Mark a flush as pending; the event loop flushes once per batch via
    /// `BufferManager::flush_if_pending`.
    Deferred,
}

/// Construction-time configuration of the buffer manager.
#[derive(Debug, Clone, Default)]
pub struct ManagerConfig {
    /// Whether the compositor advertised the presentation-time extension.
    /// When false the feedback path is never armed and synthetic feedback is
    /// produced at frame-callback time.
    pub presentation_feedback_available: bool,
    /// Dmabuf formats the compositor accepts; creation requests naming any
    /// other format are rejected.
    pub supported_formats: HashSet<u32>,
    pub flush_policy: FlushPolicy,
}

impl ManagerConfig {
    /// Convenience constructor for a config that accepts `formats`.
    pub fn with_formats(formats: impl IntoIterator<Item = u32>) -> Self {
        Self {
            supported_formats: formats.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn supports_format(&self, format: u32) -> bool {
        self.supported_formats.contains(&format)
    }
}

/// User-editable settings loaded from a TOML file.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub flush_policy: FlushPolicy,

    /// Extra format allow-list entries, merged into the advertised set.
    /// Useful against compositors that accept formats they do not advertise.
    #[serde(default)]
    pub extra_formats: Vec<u32>,
}

impl FileConfig {
    /// Loads settings from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: FileConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(
            "Loaded config: flush_policy={:?}, {} extra formats",
            config.flush_policy,
            config.extra_formats.len()
        );
        Ok(config)
    }

    /// Applies the file settings on top of a discovered manager config.
    pub fn apply(&self, config: &mut ManagerConfig) {
        config.flush_policy = self.flush_policy;
        config.supported_formats.extend(self.extra_formats.iter());
    }
}
