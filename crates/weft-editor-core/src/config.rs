use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::events::DEFAULT_INPUT_DELAY;
use crate::schema::{Schema, SchemaEntry};

/// Environment variable overriding [`EditorConfig::input_delay_ms`].
pub const INPUT_DELAY_ENV: &str = "WEFT_INPUT_DELAY_MS";

fn default_true() -> bool {
    true
}

fn default_input_delay_ms() -> u64 {
    DEFAULT_INPUT_DELAY.as_millis() as u64
}

/// Engine configuration, read from JSON.
///
/// ```json
/// { "schema": [{ "name": "mark", "type": "mark" }], "inputDelayMs": 10 }
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Extra rules, added after the defaults when those are enabled.
    #[serde(default)]
    pub schema: Vec<SchemaEntry>,
    #[serde(default = "default_true")]
    pub use_default_schema: bool,
    #[serde(default = "default_input_delay_ms")]
    pub input_delay_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            schema: Vec::new(),
            use_default_schema: true,
            input_delay_ms: default_input_delay_ms(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            message: source.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading editor config");
        Self::from_json_str(&json)
    }

    /// Apply `WEFT_INPUT_DELAY_MS` when it is set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(INPUT_DELAY_ENV) {
            self.input_delay_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: INPUT_DELAY_ENV,
                value,
            })?;
        }
        Ok(self)
    }

    pub fn input_delay(&self) -> Duration {
        Duration::from_millis(self.input_delay_ms)
    }

    /// The schema this configuration describes.
    pub fn build_schema(&self) -> Schema {
        let mut schema = if self.use_default_schema {
            Schema::with_defaults()
        } else {
            Schema::new()
        };
        schema.add(self.schema.iter().cloned());
        schema
    }
}

/// Read a JSON array of schema entries.
pub fn load_schema_rules(path: impl AsRef<Path>) -> Result<Vec<SchemaEntry>, ConfigError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
        message: source.to_string(),
        source,
    })
}
