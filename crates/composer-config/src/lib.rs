use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Column where plain-text paragraphs wrap.
pub const DEFAULT_WORD_WRAP_LENGTH: usize = 72;
/// Width of a tab stop when measuring line lengths.
pub const TAB_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Composer preferences the engine consults on every edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub word_wrap_length: usize,
    pub start_replies_at_bottom: bool,
    pub inline_spelling: bool,
    pub magic_links: bool,
    pub magic_smileys: bool,
    pub unicode_smileys: bool,
    /// Rich (HTML) editing when true, plain text otherwise
    pub html_mode: bool,
    /// Maximum number of undo steps kept
    pub history_limit: usize,
    /// Directory holding emoticon images, `~` and `$VARS` expanded on load
    pub emoticon_dir: Option<PathBuf>,
    pub paragraphs: ParagraphSettings,
}

/// Line-scanner thresholds used when plain text is turned back into
/// paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphSettings {
    /// Lines shorter than this may end a paragraph
    pub short_line_threshold: usize,
    /// Lines longer than this always end a paragraph
    pub long_line_threshold: usize,
    /// Join consecutive lines into one paragraph when the heuristics allow
    pub preserve_blocks: bool,
}

impl Default for ParagraphSettings {
    fn default() -> Self {
        Self {
            short_line_threshold: 62,
            long_line_threshold: 72,
            preserve_blocks: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            word_wrap_length: DEFAULT_WORD_WRAP_LENGTH,
            start_replies_at_bottom: false,
            inline_spelling: true,
            magic_links: true,
            magic_smileys: false,
            unicode_smileys: false,
            html_mode: true,
            history_limit: 1024,
            emoticon_dir: None,
            paragraphs: ParagraphSettings::default(),
        }
    }
}

impl Settings {
    /// Settings for a plain-text composer.
    pub fn plain_text() -> Self {
        Self {
            html_mode: false,
            ..Self::default()
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut settings: Settings =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the emoticon directory
        settings.emoticon_dir = settings
            .emoticon_dir
            .map(|dir| Self::expand_path(&dir).unwrap_or(dir));
        // A zero width would make every character its own line
        settings.word_wrap_length = settings.word_wrap_length.max(1);

        Ok(Some(settings))
    }

    /// Load from the default location, falling back to defaults when no
    /// file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        Ok(Self::load_from_path(&config_path)?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/mail-composer");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
