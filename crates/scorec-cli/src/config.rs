//! Configuration file support for scorec
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/scorec/config.toml`
//! - macOS: `~/Library/Application Support/scorec/config.toml`
//! - Windows: `%APPDATA%\scorec\config.toml`

use crate::error::{Error, Result};
use directories::ProjectDirs;
use scorec_core::{CompileOptions, Defaults, DurationToken};
use scorec_smf::EncoderOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fallbacks for notes when the music declares no defaults
    pub defaults: DefaultSettings,
    /// Output settings
    pub output: OutputSettings,
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "scorec") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        Self::write_default_config_file(&path)?;
        Ok(path)
    }

    /// Write the commented default config to `path`
    pub fn write_default_config_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = r#"# scorec configuration file

[defaults]
# Octave for notes without one, when the music declares no default (-1 to 9)
octave = 5

# Note type for notes without one, when the music declares no default
# e.g. "quarter", "eighth_dotted", "half_triplet"
note_type = "quarter"

[output]
# Directory for compiled .mid files (default: next to the input file)
# destination = "out"

# Write a track name meta event at the start of every track
track_names = true
"#;

        fs::write(path, content)?;
        Ok(())
    }

    /// Compile options derived from the configured defaults
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::default()
            .with_fallback(Defaults::new(self.defaults.octave, self.defaults.note_type))
    }

    /// Encoder options derived from the output settings
    pub fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            track_names: self.output.track_names,
        }
    }

    /// Where the compiled file for `input` goes
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let file_name = input
            .file_stem()
            .map(|stem| Path::new(stem).with_extension("mid"))
            .unwrap_or_else(|| PathBuf::from("out.mid"));
        match &self.output.destination {
            Some(dir) => dir.join(file_name),
            None => input.with_file_name(file_name),
        }
    }
}

/// Default note settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    /// Octave for notes without one (-1 to 9)
    pub octave: i8,
    /// Note type for notes without one
    pub note_type: DurationToken,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        let defaults = Defaults::default();
        Self {
            octave: defaults.octave,
            note_type: defaults.note_type,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory for compiled files
    pub destination: Option<PathBuf>,
    /// Emit track name meta events
    pub track_names: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            destination: None,
            track_names: true,
        }
    }
}
