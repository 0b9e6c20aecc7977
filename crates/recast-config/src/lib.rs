//! Configuration for the Recast engine.
//!
//! Configuration is plain data: it is loaded once (usually from a `recast.toml`)
//! and handed to the components that need it. Nothing in here is consulted
//! through globals except the tracing subscriber, which is process-wide by
//! nature.

use std::path::Path;
use std::sync::Once;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct RecastConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub changes: ChangesConfig,
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Either a simple level (`info`, `debug`, ...) or a full `EnvFilter` directive
    /// string such as `recast_core=trace,info`.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit newline-delimited JSON instead of human readable lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    /// The effective filter: the configured directives, merged with `RUST_LOG` when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let config_directives = Self::normalize_level_directives(&self.level);
        let fallback = || {
            tracing_subscriber::EnvFilter::try_new(&config_directives).unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::default()
                    .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
            })
        };

        match std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
        {
            Some(env_directives) => tracing_subscriber::EnvFilter::try_new(format!(
                "{config_directives},{env_directives}"
            ))
            .unwrap_or_else(|_| fallback()),
            None => fallback(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

/// Execution policy for change trees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct ChangesConfig {
    /// When a composite change aborts, replay the inverses of the children that
    /// already committed. Off by default: the caller receives the partial rollback
    /// with the error and decides.
    #[serde(default)]
    pub rollback_on_abort: bool,

    /// Abort on the first failing change. When disabled, failing changes are
    /// logged and skipped.
    #[serde(default = "ChangesConfig::default_abort_on_failure")]
    pub abort_on_failure: bool,
}

impl ChangesConfig {
    fn default_abort_on_failure() -> bool {
        true
    }
}

impl Default for ChangesConfig {
    fn default() -> Self {
        Self {
            rollback_on_abort: false,
            abort_on_failure: Self::default_abort_on_failure(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct UndoConfig {
    /// Maximum number of undo entries kept; the oldest entries are dropped first.
    /// Unlimited when unset.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct PreviewConfig {
    /// Unchanged lines shown around each hunk of a preview diff.
    #[serde(default = "PreviewConfig::default_context_lines")]
    pub context_lines: usize,
}

impl PreviewConfig {
    fn default_context_lines() -> usize {
        3
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            context_lines: Self::default_context_lines(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(String),
    #[error("invalid value for `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a snippet of the input; keep just the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl RecastConfig {
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: RecastConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.undo.limit == Some(0) {
            return Err(ConfigError::Invalid {
                field: "undo.limit",
                message: "must be at least 1; omit it for an unlimited history".to_owned(),
            });
        }
        Ok(())
    }
}

/// JSON schema of the configuration file, for editor integrations.
pub fn json_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(RecastConfig);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}

static TRACING_INIT: Once = Once::new();

/// Installs the global tracing subscriber.
///
/// Safe to call more than once; only the first call installs anything. Returns
/// whether this call installed the subscriber.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let mut installed = false;
    TRACING_INIT.call_once(|| {
        // `cargo test` only captures output written through the test writer.
        let writer = if cfg!(debug_assertions) {
            BoxMakeWriter::new(tracing_subscriber::fmt::writer::TestWriter::with_stderr)
        } else {
            BoxMakeWriter::new(std::io::stderr)
        };

        let registry = tracing_subscriber::registry().with(config.env_filter());
        let result = if config.json {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(writer))
                .try_init()
        };
        installed = result.is_ok();
    });
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_uses_defaults() {
        let config = RecastConfig::load_from_str("").unwrap();
        assert_eq!(config, RecastConfig::default());
        assert!(config.changes.abort_on_failure);
        assert!(!config.changes.rollback_on_abort);
        assert_eq!(config.preview.context_lines, 3);
        assert_eq!(config.undo.limit, None);
    }

    #[test]
    fn sections_override_defaults() {
        let config = RecastConfig::load_from_str(
            r#"
[logging]
level = "debug"
json = true

[changes]
rollback_on_abort = true

[undo]
limit = 25

[preview]
context_lines = 1
"#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.changes.rollback_on_abort);
        assert!(config.changes.abort_on_failure);
        assert_eq!(config.undo.limit, Some(25));
        assert_eq!(config.preview.context_lines, 1);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RecastConfig::load_from_str("[changes]\nrollback = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(message) if message.contains("rollback")));
    }

    #[test]
    fn zero_undo_limit_is_invalid() {
        let err = RecastConfig::load_from_str("[undo]\nlimit = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "undo.limit",
                ..
            }
        ));
    }

    #[test]
    fn load_from_path_reads_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recast.toml");
        std::fs::write(&path, "[preview]\ncontext_lines = 5\n").unwrap();

        let config = RecastConfig::load_from_path(&path).unwrap();
        assert_eq!(config.preview.context_lines, 5);

        let missing = RecastConfig::load_from_path(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn level_synonyms_are_normalized() {
        assert_eq!(LoggingConfig::normalize_level_directives(" WARNING "), "warn");
        assert_eq!(LoggingConfig::normalize_level_directives(""), "info");
        assert_eq!(
            LoggingConfig::normalize_level_directives("recast_core=trace"),
            "recast_core=trace"
        );
    }

    #[test]
    fn schema_lists_every_section() {
        let schema = json_schema();
        let properties = schema["properties"].as_object().unwrap();
        for section in ["logging", "changes", "undo", "preview"] {
            assert!(properties.contains_key(section), "missing {section}");
        }
    }

    #[test]
    fn tracing_is_installed_at_most_once() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
        tracing::info!("tracing initialized");
    }
}
