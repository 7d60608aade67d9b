//! `sable.toml` configuration.
//!
//! ```toml
//! [transpile]
//! max_tuple_arity = 6
//! default_error_type = "error"
//! emit_helpers = true
//!
//! [format]
//! indent_with_tabs = true
//! indent_size = 4
//! max_width = 100
//! ```
//!
//! Every key is optional.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use sable_lower::LowerOptions;
use sable_prep::PrepOptions;
use sable_syntax::FormatConfig;

/// Name of the configuration file looked up next to the input.
pub const CONFIG_FILE: &str = "sable.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SableConfig {
    #[serde(default)]
    pub transpile: TranspileConfig,
    #[serde(default)]
    pub format: FormatSection,
}

/// The `[transpile]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranspileConfig {
    pub max_tuple_arity: usize,
    /// Host type text, parsed when the options are built.
    pub default_error_type: String,
    pub emit_helpers: bool,
}

impl Default for TranspileConfig {
    fn default() -> Self {
        Self {
            max_tuple_arity: 6,
            default_error_type: "error".to_string(),
            emit_helpers: true,
        }
    }
}

/// The `[format]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatSection {
    pub indent_with_tabs: bool,
    pub indent_size: usize,
    pub max_width: usize,
}

impl Default for FormatSection {
    fn default() -> Self {
        Self {
            indent_with_tabs: true,
            indent_size: 4,
            max_width: 100,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "failed to read {}: {}", path.display(), source),
            ConfigError::Parse(err) => write!(f, "invalid {CONFIG_FILE}: {err}"),
            ConfigError::Invalid(message) => write!(f, "invalid {CONFIG_FILE}: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl SableConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: SableConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `sable.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading configuration");
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.transpile.max_tuple_arity < 2 {
            return Err(ConfigError::Invalid("`transpile.max_tuple_arity` must be at least 2".into()));
        }
        if self.format.indent_size == 0 {
            return Err(ConfigError::Invalid("`format.indent_size` must be positive".into()));
        }
        self.error_type()?;
        Ok(())
    }

    fn error_type(&self) -> Result<sable_syntax::ast::TypeExpr, ConfigError> {
        sable_syntax::parse_type(&self.transpile.default_error_type).map_err(|err| {
            ConfigError::Invalid(format!(
                "`transpile.default_error_type` is not a type: {}",
                err.message
            ))
        })
    }

    pub fn prep_options(&self) -> PrepOptions {
        PrepOptions {
            max_tuple_arity: self.transpile.max_tuple_arity,
        }
    }

    pub fn lower_options(&self) -> Result<LowerOptions, ConfigError> {
        Ok(LowerOptions {
            default_error_type: self.error_type()?,
            emit_helpers: self.transpile.emit_helpers,
        })
    }

    pub fn format_config(&self) -> FormatConfig {
        FormatConfig {
            indent_with_tabs: self.format.indent_with_tabs,
            indent_size: self.format.indent_size,
            max_width: self.format.max_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_syntax::ast::TypeExpr;

    #[test]
    fn empty_file_gives_defaults() {
        let config = SableConfig::from_str("").unwrap();
        assert_eq!(config, SableConfig::default());
        assert_eq!(config.prep_options(), PrepOptions::default());
        assert_eq!(config.lower_options().unwrap(), LowerOptions::default());
        assert_eq!(config.format_config(), FormatConfig::default());
    }

    #[test]
    fn tables_override_defaults() {
        let config = SableConfig::from_str(
            r#"
[transpile]
max_tuple_arity = 3
default_error_type = "*AppError"
emit_helpers = false

[format]
indent_with_tabs = false
indent_size = 2
"#,
        )
        .unwrap();
        assert_eq!(config.prep_options().max_tuple_arity, 3);
        let lower = config.lower_options().unwrap();
        assert_eq!(lower.default_error_type, TypeExpr::pointer(TypeExpr::named("AppError")));
        assert!(!lower.emit_helpers);
        let format = config.format_config();
        assert!(!format.indent_with_tabs);
        assert_eq!(format.indent_size, 2);
        assert_eq!(format.max_width, 100);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SableConfig::from_str("[transpile]\nmax_arity = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bad_error_type_is_invalid() {
        let err = SableConfig::from_str("[transpile]\ndefault_error_type = \"[[\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(SableConfig::discover(dir.path()).unwrap(), SableConfig::default());
        std::fs::write(dir.path().join(CONFIG_FILE), "[format]\nmax_width = 80\n").unwrap();
        assert_eq!(SableConfig::discover(dir.path()).unwrap().format.max_width, 80);
    }
}
