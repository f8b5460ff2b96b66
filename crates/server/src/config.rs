//! Per-world configuration files.
//!
//! One JSON file per world. A missing file is created with defaults; a file
//! that fails to parse or carries an unsupported version is backed up next
//! to the original and regenerated -- world start never fails on bad
//! configuration.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use shroud_engine::modifier::MaskingRules;
use shroud_engine::world::ViewConfig;
use shroud_engine::world::block::BlockId;

use crate::block::{self, Dimension};

pub const CURRENT_CONFIG_VERSION: u32 = 1;
pub const MINIMUM_CONFIG_VERSION: u32 = 1;

/// Modifier strategy selection, by id.
pub const MODIFIER_CAVITY: &str = "cavity";
pub const MODIFIER_DECOY: &str = "decoy";
pub const MODIFIER_NONE: &str = "none";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub config_version: u32,

    /// Distance around a revealing event within which cells are restored.
    pub deobfuscation_radius: i32,

    /// Active strategy id: "cavity", "decoy" or "none".
    pub modifier: String,

    /// Block names masked by the bundled strategies. Empty means the
    /// default ore set. Unknown names are skipped with a warning.
    pub candidate_blocks: Vec<String>,

    /// Filler block name; unset means the dimension's bulk terrain.
    pub filler: Option<String>,

    /// Decoy block name for the "decoy" strategy.
    pub decoy: Option<String>,

    pub dynamism: DynamismConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamismConfig {
    /// When enabled, chunks inside some player's dynamic view are
    /// obfuscated ahead of everything else.
    pub enabled: bool,
    /// Dynamic view radius, in chunks, around each player.
    pub chunk_radius: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Pause between background passes, in milliseconds.
    pub interval_ms: u64,
    /// Upper bound on chunks obfuscated per pass (throttle under heavy
    /// chunk loading).
    pub max_chunks_per_pass: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION,
            deobfuscation_radius: 2,
            modifier: MODIFIER_CAVITY.into(),
            candidate_blocks: Vec::new(),
            filler: None,
            decoy: None,
            dynamism: DynamismConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl Default for DynamismConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_radius: 4,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            max_chunks_per_pass: 8,
        }
    }
}

impl WorldConfig {
    /// Build the engine-side view configuration. Negative radii from
    /// hand-edited files clamp to zero.
    pub fn view_config(&self) -> ViewConfig {
        if self.deobfuscation_radius < 0 {
            tracing::warn!(
                radius = self.deobfuscation_radius,
                "negative deobfuscation_radius clamped to 0"
            );
        }
        ViewConfig {
            deobfuscation_radius: self.deobfuscation_radius.max(0),
        }
    }

    /// Resolve the configured block names into masking rules for the given
    /// dimension. Unknown names fail open to non-candidate.
    pub fn masking_rules(&self, dimension: Dimension) -> MaskingRules {
        let candidates: HashSet<BlockId> = if self.candidate_blocks.is_empty() {
            block::default_candidates().iter().copied().collect()
        } else {
            self.candidate_blocks
                .iter()
                .filter_map(|name| {
                    let id = block::by_name(name);
                    if id.is_none() {
                        tracing::warn!(%name, "unknown candidate block, treating as non-sensitive");
                    }
                    id
                })
                .collect()
        };

        let filler = self
            .filler
            .as_deref()
            .and_then(|name| {
                let id = block::by_name(name);
                if id.is_none() {
                    tracing::warn!(%name, "unknown filler block, using dimension default");
                }
                id
            })
            .unwrap_or_else(|| block::dimension_filler(dimension));

        MaskingRules {
            candidates,
            water: block::water_states().collect(),
            filler,
        }
    }

    /// The decoy block for the "decoy" strategy.
    pub fn decoy_block(&self) -> BlockId {
        self.decoy
            .as_deref()
            .and_then(|name| {
                let id = block::by_name(name);
                if id.is_none() {
                    tracing::warn!(%name, "unknown decoy block, using redstone block");
                }
                id
            })
            .unwrap_or(block::REDSTONE_BLOCK)
    }
}

/// Load a world's configuration, regenerating defaults when the file is
/// missing, malformed, or of an unsupported version. The old file is kept
/// as `<name>.broken` so nothing hand-written is lost.
pub fn load_or_create(path: &Path) -> Result<WorldConfig> {
    if !path.exists() {
        let config = WorldConfig::default();
        write_config(path, &config)?;
        tracing::info!(path = %path.display(), "created default world config");
        return Ok(config);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;

    match serde_json::from_str::<WorldConfig>(&raw) {
        Ok(config)
            if (MINIMUM_CONFIG_VERSION..=CURRENT_CONFIG_VERSION)
                .contains(&config.config_version) =>
        {
            Ok(config)
        }
        Ok(config) => {
            tracing::warn!(
                path = %path.display(),
                version = config.config_version,
                supported = ?(MINIMUM_CONFIG_VERSION..=CURRENT_CONFIG_VERSION),
                "unsupported config version, regenerating defaults"
            );
            backup_and_regenerate(path)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "malformed world config, regenerating defaults"
            );
            backup_and_regenerate(path)
        }
    }
}

fn backup_and_regenerate(path: &Path) -> Result<WorldConfig> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".broken");
    fs::rename(path, &backup)
        .with_context(|| format!("backing up config {}", path.display()))?;

    let config = WorldConfig::default();
    write_config(path, &config)?;
    Ok(config)
}

fn write_config(path: &Path, config: &WorldConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating config dir {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).with_context(|| format!("writing config {}", path.display()))
}
