//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\cue-minder\config.toml
//! - macOS: ~/Library/Application Support/cue-minder/config.toml
//! - Linux: ~/.config/cue-minder/config.toml
//!
//! The config file holds defaults for run options and metadata overrides.
//! CLI flags win over file values; the merged result is a [`RunConfig`],
//! which is immutable for the whole run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::titling::{CapsMode, coerce_title};

/// Defaults loaded from the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Run-behavior defaults
    pub run: RunDefaults,

    /// Album metadata overrides (normally given per-run on the CLI)
    pub overrides: Overrides,
}

/// Run-behavior defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    /// Minimum audio files for a directory to count as an album
    pub min_tracks: usize,

    /// Skip replay-gain verification and computation
    pub skip_replay_gain: bool,

    /// Reconcile the composer field as well
    pub unify_composer: bool,

    /// Disable title capitalization (for non-English libraries)
    pub no_cap: bool,

    /// Target edge length for cover images, pixels
    pub cover_edge: u32,

    /// JPEG re-encode quality for covers
    pub cover_quality: u32,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            min_tracks: 3,
            skip_replay_gain: false,
            unify_composer: false,
            no_cap: false,
            cover_edge: 1000,
            cover_quality: 80,
        }
    }
}

/// Album metadata overrides; each beats every inference source when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub composer: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
}

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cue-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> FileConfig {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return FileConfig::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return FileConfig::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                FileConfig::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            FileConfig::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &FileConfig) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

/// The merged, immutable per-run configuration.
///
/// Built once from file defaults and CLI flags, then shared read-only by the
/// resolver, matcher, planner, and apply pass.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory under reconciliation
    pub base_dir: PathBuf,
    /// Treat `base_dir` itself as one album instead of a collection
    pub single_album: bool,
    pub caps_mode: CapsMode,
    pub unify_composer: bool,
    pub skip_replay_gain: bool,
    pub min_tracks: usize,
    pub cover_edge: u32,
    pub cover_quality: u32,
    pub overrides: Overrides,
}

impl RunConfig {
    /// Merge file defaults with CLI values. CLI `Some(..)`/`true` wins.
    pub fn merge(
        file: &FileConfig,
        base_dir: PathBuf,
        single_album: bool,
        no_cap: bool,
        unify_composer: bool,
        skip_replay_gain: bool,
        min_tracks: Option<usize>,
        cli_overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let overrides = Overrides {
            artist: cli_overrides.artist.or_else(|| file.overrides.artist.clone()),
            album: cli_overrides.album.or_else(|| file.overrides.album.clone()),
            composer: cli_overrides
                .composer
                .or_else(|| file.overrides.composer.clone()),
            year: cli_overrides.year.or(file.overrides.year),
            genre: cli_overrides.genre.or_else(|| file.overrides.genre.clone()),
        };
        let caps_mode = if no_cap || file.run.no_cap {
            CapsMode::Preserve
        } else {
            CapsMode::Smart
        };
        if let Some(album) = &overrides.album {
            // The album override is trusted verbatim, so it must already be
            // in coerced form
            if *album != coerce_title(album, caps_mode) {
                return Err(ConfigError::UncoercedAlbumOverride(album.clone()));
            }
            if !single_album {
                return Err(ConfigError::AlbumOverrideNeedsSingleAlbum);
            }
        }
        Ok(Self {
            base_dir,
            single_album,
            caps_mode,
            unify_composer: unify_composer || file.run.unify_composer || overrides.composer.is_some(),
            skip_replay_gain: skip_replay_gain || file.run.skip_replay_gain,
            min_tracks: min_tracks.unwrap_or(file.run.min_tracks),
            cover_edge: file.run.cover_edge,
            cover_quality: file.run.cover_quality,
            overrides,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),

    #[error("Album override '{0}' is not in coerced form")]
    UncoercedAlbumOverride(String),

    #[error("--album requires --single-album")]
    AlbumOverrideNeedsSingleAlbum,
}
