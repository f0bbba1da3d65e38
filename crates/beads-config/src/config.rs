//! Configuration types and loading for the beads system.
//!
//! The main entry point is [`BeadsConfig`], which represents the contents of
//! `.beads/config.yaml`. Configuration is loaded with [`load_config`] and
//! saved with [`save_config`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration file contained invalid YAML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// The `.beads/` directory was not found.
    #[error("no .beads directory found (run 'bd init' first)")]
    BeadsDirNotFound,

    /// A redirect file pointed somewhere unusable.
    #[error("redirect file at {path} is invalid: {reason}")]
    BadRedirect {
        /// The redirect file location.
        path: String,
        /// Why the redirect could not be followed.
        reason: String,
    },

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sync mode
// ---------------------------------------------------------------------------

/// The sync mode controlling how a workspace exchanges state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Export on push, import on pull; state rides on git (the default).
    #[default]
    GitPortable,
    /// Export on every mutation.
    Realtime,
    /// Sync via the backend's native replication; never write JSONL.
    NativeRemote,
    /// Native replication plus JSONL for portability.
    Both,
}

impl SyncMode {
    /// Returns the string form used in config keys and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitPortable => "git-portable",
            Self::Realtime => "realtime",
            Self::NativeRemote => "native-remote",
            Self::Both => "both",
        }
    }

    /// Parses a mode name; unknown names are rejected.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "git-portable" => Ok(Self::GitPortable),
            "realtime" => Ok(Self::Realtime),
            "native-remote" => Ok(Self::NativeRemote),
            "both" => Ok(Self::Both),
            other => Err(ConfigError::InvalidValue {
                key: "sync.mode".into(),
                reason: format!(
                    "unknown mode '{other}' (expected git-portable, realtime, native-remote, both)"
                ),
            }),
        }
    }

    /// All known modes, for `sync mode list`.
    pub fn all() -> &'static [Self] {
        &[
            Self::GitPortable,
            Self::Realtime,
            Self::NativeRemote,
            Self::Both,
        ]
    }

    /// Whether this mode writes the portable JSONL journal.
    pub fn writes_jsonl(&self) -> bool {
        !matches!(self, Self::NativeRemote)
    }

    /// The default export trigger for this mode.
    pub fn default_export_on(&self) -> SyncTrigger {
        match self {
            Self::Realtime => SyncTrigger::Change,
            _ => SyncTrigger::Push,
        }
    }

    /// The default import trigger for this mode.
    pub fn default_import_on(&self) -> SyncTrigger {
        match self {
            Self::Realtime => SyncTrigger::Change,
            _ => SyncTrigger::Pull,
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When an export or import fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    Push,
    Pull,
    Change,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Change => "change",
        }
    }
}

// ---------------------------------------------------------------------------
// Conflict resolution
// ---------------------------------------------------------------------------

/// Policy applied when both sides of a merge changed the same bead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Prefer local changes.
    Local,
    /// Prefer the incoming (external) record.
    External,
    /// Last-writer-wins by `updated_at`, ties broken by ID (the default).
    #[default]
    Timestamp,
    /// Alias for timestamp.
    Newer,
}

impl ConflictResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::External => "external",
            Self::Timestamp => "timestamp",
            Self::Newer => "newer",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Self::Local),
            "external" => Ok(Self::External),
            "timestamp" => Ok(Self::Timestamp),
            "newer" => Ok(Self::Newer),
            other => Err(ConfigError::InvalidValue {
                key: "sync.conflict_resolution".into(),
                reason: format!(
                    "unknown policy '{other}' (expected local, external, timestamp, newer)"
                ),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Sync configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// The sync mode.
    #[serde(default)]
    pub mode: SyncMode,

    /// Sync branch; empty means the checked-out branch.
    #[serde(default)]
    pub branch: String,

    /// Git remote used by sync commits.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// When to trigger export; `None` uses the mode default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_on: Option<SyncTrigger>,

    /// When to trigger import; `None` uses the mode default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_on: Option<SyncTrigger>,

    /// Conflict policy for three-way merges.
    #[serde(default)]
    pub conflict_resolution: ConflictResolution,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            branch: String::new(),
            remote: default_remote(),
            export_on: None,
            import_on: None,
            conflict_resolution: ConflictResolution::default(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

impl SyncConfig {
    /// The effective export trigger (explicit setting or mode default).
    pub fn effective_export_on(&self) -> SyncTrigger {
        self.export_on.unwrap_or_else(|| self.mode.default_export_on())
    }

    /// The effective import trigger (explicit setting or mode default).
    pub fn effective_import_on(&self) -> SyncTrigger {
        self.import_on.unwrap_or_else(|| self.mode.default_import_on())
    }
}

/// Deletion-manifest configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionsConfig {
    /// Auto-compact the manifest when it exceeds the threshold.
    #[serde(default = "default_true")]
    pub auto_compact: bool,

    /// Entry count above which compaction runs.
    #[serde(default = "default_compact_threshold")]
    pub auto_compact_threshold: usize,

    /// Entries older than this many days may be dropped by compaction.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for DeletionsConfig {
    fn default() -> Self {
        Self {
            auto_compact: true,
            auto_compact_threshold: default_compact_threshold(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_compact_threshold() -> usize {
    1000
}

fn default_retention_days() -> i64 {
    30
}

/// Daemon configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DaemonConfig {
    /// Optional TCP listener address (e.g. `127.0.0.1:4780`). Requires
    /// `BEADS_DAEMON_TOKEN` for authentication. Unset disables TCP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_addr: Option<String>,

    /// Auto-flush debounce in seconds (default 5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_delay_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// BeadsConfig
// ---------------------------------------------------------------------------

/// Contents of `.beads/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BeadsConfig {
    /// Workspace ID prefix (e.g. `proj` for IDs like `proj-abc12`).
    #[serde(default)]
    pub issue_prefix: String,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub deletions: DeletionsConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// The config file name inside `.beads/`.
pub const CONFIG_FILE: &str = "config.yaml";

/// Loads `config.yaml` from a `.beads/` directory. A missing file yields the
/// defaults.
pub fn load_config(beads_dir: &Path) -> Result<BeadsConfig> {
    let path = beads_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(BeadsConfig::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(serde_yaml::from_str(&raw)?)
}

/// Saves `config.yaml` into a `.beads/` directory.
pub fn save_config(beads_dir: &Path, config: &BeadsConfig) -> Result<()> {
    let path = beads_dir.join(CONFIG_FILE);
    let raw = serde_yaml::to_string(config)?;
    std::fs::write(path, raw)?;
    Ok(())
}
