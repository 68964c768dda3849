//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/astviz/astviz.toml`
//! 3. Local config: `./.astviz.toml`, or the file passed with `--config`
//! 4. Environment variables: `ASTVIZ_*` prefix, `__` between section and key
//!    (e.g. `ASTVIZ_SERVER__BASE_URL`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{LayoutConfig, Margin};

/// Parser service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the parser service
    pub base_url: String,
    /// Source store endpoint (POST `{code}`)
    pub save_path: String,
    /// Parser trigger endpoint (POST, empty body)
    pub parse_path: String,
    /// Tree document
    pub tree_path: String,
    /// Trace document
    pub trace_path: String,
    /// Sample source
    pub sample_path: String,
    /// Per-call timeout in seconds; 0 disables it
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".into(),
            save_path: "/save-code".into(),
            parse_path: "/run-parser".into(),
            tree_path: "/tree.json".into(),
            trace_path: "/trace.json".into(),
            sample_path: "/input.cpp".into(),
            timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Diagram geometry and output location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Where the SVG diagram is written
    pub output: PathBuf,
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    /// Space after the deepest level reserved for leaf labels
    pub label_reserve: f64,
    pub sibling_separation: f64,
    pub cousin_separation: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let layout = LayoutConfig::default();
        Self {
            output: PathBuf::from("astviz.svg"),
            width: layout.width,
            height: layout.height,
            margin_top: layout.margin.top,
            margin_right: layout.margin.right,
            margin_bottom: layout.margin.bottom,
            margin_left: layout.margin.left,
            label_reserve: layout.label_reserve,
            sibling_separation: layout.sibling_separation,
            cousin_separation: layout.cousin_separation,
        }
    }
}

impl RenderConfig {
    pub fn layout(&self) -> LayoutConfig {
        LayoutConfig {
            width: self.width,
            height: self.height,
            margin: Margin {
                top: self.margin_top,
                right: self.margin_right,
                bottom: self.margin_bottom,
                left: self.margin_left,
            },
            label_reserve: self.label_reserve,
            sibling_separation: self.sibling_separation,
            cousin_separation: self.cousin_separation,
        }
    }
}

/// What a submission does while another one is still running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Refuse the new submission (the trigger is disabled)
    #[default]
    Reject,
    /// Start the new submission and discard the older run's results
    Supersede,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub on_busy: BusyPolicy,
}

/// Unified configuration for astviz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub pipeline: PipelineConfig,
}

/// Get the XDG config directory for astviz.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "astviz").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("astviz.toml"))
}

/// Local config file in the working directory.
pub fn local_config_path() -> PathBuf {
    PathBuf::from(".astviz.toml")
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Config file given on the command line; replaces the local
    ///   config and must exist
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        let (local, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (local_config_path(), false),
        };
        Self::load_from(global.as_deref(), Some((&local, required)), "ASTVIZ")
    }

    /// Load from explicit sources. `env_prefix` selects the environment layer.
    pub fn load_from(
        global: Option<&Path>,
        local: Option<(&Path, bool)>,
        env_prefix: &str,
    ) -> Result<Self, ApplicationError> {
        let defaults = Config::try_from(&Settings::default()).map_err(config_err)?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = global {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }
        if let Some((path, required)) = local {
            if required && !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    /// Expand `~` and `$VAR` in the output path.
    fn expand_paths(&mut self) {
        let raw = self.render.output.to_string_lossy().to_string();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.render.output = PathBuf::from(expanded.as_ref());
        }
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        let layout = self.render.layout();
        if layout.breadth_size() <= 0.0 || layout.depth_size() <= 0.0 {
            return Err(ApplicationError::Config {
                message: format!(
                    "canvas {}x{} leaves no room inside margins",
                    self.render.width, self.render.height
                ),
            });
        }
        if self.render.sibling_separation <= 0.0 || self.render.cousin_separation <= 0.0 {
            return Err(ApplicationError::Config {
                message: "separations must be positive".into(),
            });
        }
        Ok(())
    }

    /// Effective settings as TOML, for `astviz config show`.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}
