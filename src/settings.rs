use crate::hotkey::{parse_chord, parse_key, Chord, Key};
use crate::picker::controller::SamplingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DATABASE_FILE_NAME: &str = "colors.db";
const APP_DIR_NAME: &str = "screen_swatch";

const MIN_PREVIEW_INTERVAL_MS: u64 = 10;
const MAX_PREVIEW_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Held modifier plus trigger that commits the hovered colour.
    #[serde(default = "default_commit_chord")]
    pub commit_chord: String,
    /// Key that ends a sampling session. `None` disables the shortcut.
    #[serde(default = "default_cancel_key")]
    pub cancel_key: Option<String>,
    #[serde(default = "default_preview_interval_ms")]
    pub preview_interval_ms: u64,
    /// Upper bound for a single screen capture. `None` waits indefinitely.
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: Option<u64>,
    /// Location of the colour database. Defaults to the per-user data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_palette_columns")]
    pub palette_columns: usize,
    #[serde(default)]
    pub always_on_top: bool,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_commit_chord() -> String {
    "Alt+1".into()
}

fn default_cancel_key() -> Option<String> {
    Some("Escape".into())
}

fn default_preview_interval_ms() -> u64 {
    30
}

fn default_capture_timeout_ms() -> Option<u64> {
    Some(500)
}

fn default_palette_columns() -> usize {
    6
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            commit_chord: default_commit_chord(),
            cancel_key: default_cancel_key(),
            preview_interval_ms: default_preview_interval_ms(),
            capture_timeout_ms: default_capture_timeout_ms(),
            database_path: None,
            palette_columns: default_palette_columns(),
            always_on_top: false,
            debug_logging: false,
            log_file: None,
        }
    }
}

impl Settings {
    /// Missing or empty files yield the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("read settings file {}", path.display()))
            }
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("deserialize settings file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("create settings parent folder {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("write settings file {}", path.display()))
    }

    pub fn commit_chord(&self) -> Chord {
        match parse_chord(&self.commit_chord) {
            Some(chord) => chord,
            None => {
                tracing::warn!(
                    "provided commit_chord string '{}' is invalid; using default Alt+1",
                    self.commit_chord
                );
                Chord::default()
            }
        }
    }

    pub fn cancel_key(&self) -> Option<Key> {
        let raw = self.cancel_key.as_deref()?;
        match parse_key(raw) {
            Some(Key::Modifier(_)) | None => {
                tracing::warn!("provided cancel_key '{}' is invalid; using Escape", raw);
                Some(Key::Escape)
            }
            Some(key) => Some(key),
        }
    }

    pub fn preview_interval(&self) -> Duration {
        Duration::from_millis(
            self.preview_interval_ms
                .clamp(MIN_PREVIEW_INTERVAL_MS, MAX_PREVIEW_INTERVAL_MS),
        )
    }

    pub fn capture_timeout(&self) -> Option<Duration> {
        self.capture_timeout_ms.map(Duration::from_millis)
    }

    pub fn palette_columns(&self) -> usize {
        self.palette_columns.max(1)
    }

    /// Configured database path, or `colors.db` in the data directory.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_dir().join(DATABASE_FILE_NAME))
    }

    pub fn sampling_config(&self) -> SamplingConfig {
        SamplingConfig {
            chord: self.commit_chord(),
            cancel_key: self.cancel_key(),
            preview_interval: self.preview_interval(),
        }
    }
}

/// Per-user data directory, falling back to the working directory.
pub fn data_dir() -> PathBuf {
    dirs_next::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

/// `settings.json` next to the executable if one exists there, otherwise
/// in the data directory.
pub fn resolve_settings_path() -> PathBuf {
    let beside_exe = std::env::current_exe()
        .context("resolve current executable")
        .and_then(|exe| settings_path_from_exe_path(&exe));
    match beside_exe {
        Ok(path) if path.exists() => path,
        Ok(_) => data_dir().join(SETTINGS_FILE_NAME),
        Err(err) => {
            tracing::debug!(?err, "falling back to data directory for settings");
            data_dir().join(SETTINGS_FILE_NAME)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifier;

    #[test]
    fn settings_path_is_resolved_next_to_executable() {
        let exe = Path::new("/tmp/myapp/bin/screen_swatch");
        let path = settings_path_from_exe_path(exe).expect("path");
        assert_eq!(path, Path::new("/tmp/myapp/bin").join(SETTINGS_FILE_NAME));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let loaded = Settings::load(&dir.path().join(SETTINGS_FILE_NAME)).expect("load");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, r#"{ "palette_columns": 4, "always_on_top": true }"#)
            .expect("write");
        let loaded = Settings::load(&path).expect("load");
        assert_eq!(loaded.palette_columns, 4);
        assert!(loaded.always_on_top);
        assert_eq!(loaded.commit_chord, "Alt+1");
        assert_eq!(loaded.capture_timeout_ms, Some(500));
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);
        let settings = Settings {
            commit_chord: "Ctrl+P".into(),
            capture_timeout_ms: None,
            database_path: Some(dir.path().join("swatches.db")),
            ..Settings::default()
        };
        settings.save(&path).expect("save");
        assert_eq!(Settings::load(&path).expect("load"), settings);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "{ not json").expect("write");
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn invalid_chord_falls_back_to_default() {
        let settings = Settings {
            commit_chord: "Alt+Nope".into(),
            ..Settings::default()
        };
        assert_eq!(settings.commit_chord(), Chord::default());
    }

    #[test]
    fn derived_values_are_clamped() {
        let settings = Settings {
            preview_interval_ms: 1,
            palette_columns: 0,
            cancel_key: Some("Shift".into()),
            ..Settings::default()
        };
        assert_eq!(settings.preview_interval(), Duration::from_millis(10));
        assert_eq!(settings.palette_columns(), 1);
        assert_eq!(settings.cancel_key(), Some(Key::Escape));

        let slow = Settings {
            preview_interval_ms: 60_000,
            ..Settings::default()
        };
        assert_eq!(slow.preview_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn sampling_config_uses_parsed_values() {
        let settings = Settings {
            commit_chord: "Shift+F2".into(),
            cancel_key: None,
            preview_interval_ms: 50,
            ..Settings::default()
        };
        let config = settings.sampling_config();
        assert_eq!(config.chord.modifier, Modifier::Shift);
        assert_eq!(config.chord.trigger, Key::Function(2));
        assert_eq!(config.cancel_key, None);
        assert_eq!(config.preview_interval, Duration::from_millis(50));
    }
}
