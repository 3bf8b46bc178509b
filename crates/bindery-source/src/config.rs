#![forbid(unsafe_code)]

//! Behavior switches for a [`DataSource`](crate::DataSource).
//!
//! Defaults match a plain list: tapping a row reports a selection and then
//! deselects it again, and the view offers neither deletion nor reordering.
//!
//! # Loading
//!
//! With the `config` feature enabled the same struct loads from TOML or
//! JSON:
//!
//! ```toml
//! deselect_on_selection = false
//! allows_deletion = true
//! reuse_identifier = "ContactCell"
//! ```
//!
//! ```rust,ignore
//! let config = DataSourceConfig::from_toml_file("contacts.toml")?;
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Default reuse identifier for [`DataSource::use_configured_cell`](crate::DataSource::use_configured_cell).
pub const DEFAULT_REUSE_IDENTIFIER: &str = "Cell";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct DataSourceConfig {
    /// Deselect a row right after reporting its selection.
    pub deselect_on_selection: bool,
    /// Let the view offer reordering (`can_move`).
    pub allows_moving: bool,
    /// Let the view offer deletion (`can_edit`).
    pub allows_deletion: bool,
    /// Identifier passed to `dequeue_cell` by `use_configured_cell`.
    pub reuse_identifier: String,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            deselect_on_selection: true,
            allows_moving: false,
            allows_deletion: false,
            reuse_identifier: DEFAULT_REUSE_IDENTIFIER.to_owned(),
        }
    }
}

impl DataSourceConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Check field values.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.reuse_identifier.trim().is_empty() {
            errors.push("reuse_identifier must not be empty".into());
        } else if self.reuse_identifier.chars().any(char::is_whitespace) {
            errors.push(format!(
                "reuse_identifier must not contain whitespace, got {:?}",
                self.reuse_identifier
            ));
        }
        errors
    }

    #[cfg(feature = "config")]
    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors loading a [`DataSourceConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DataSourceConfig::default();
        assert!(config.deselect_on_selection);
        assert!(!config.allows_moving);
        assert!(!config.allows_deletion);
        assert_eq!(config.reuse_identifier, "Cell");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn validate_rejects_blank_identifier() {
        let config = DataSourceConfig {
            reuse_identifier: "  ".into(),
            ..DataSourceConfig::default()
        };
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("must not be empty")));
    }

    #[test]
    fn validate_rejects_whitespace_in_identifier() {
        let config = DataSourceConfig {
            reuse_identifier: "My Cell".into(),
            ..DataSourceConfig::default()
        };
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn validation_error_display_joins() {
        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation errors: a; b");
    }

    #[cfg(feature = "config")]
    mod loading {
        use super::super::*;

        #[test]
        fn toml_partial_keeps_defaults() {
            let config = DataSourceConfig::from_toml_str("allows_deletion = true\n").unwrap();
            assert!(config.allows_deletion);
            assert!(config.deselect_on_selection);
            assert_eq!(config.reuse_identifier, DEFAULT_REUSE_IDENTIFIER);
        }

        #[test]
        fn json_round_trip() {
            let config = DataSourceConfig {
                allows_moving: true,
                reuse_identifier: "Row".into(),
                ..DataSourceConfig::default()
            };
            let json = serde_json::to_string(&config).unwrap();
            assert_eq!(DataSourceConfig::from_json_str(&json).unwrap(), config);
        }

        #[test]
        fn invalid_toml_is_toml_error() {
            let err = DataSourceConfig::from_toml_str("allows_moving = 3").unwrap_err();
            assert!(matches!(err, ConfigError::Toml(_)));
            assert!(err.to_string().starts_with("TOML parse error"));
        }

        #[test]
        fn loaded_config_is_validated() {
            let err = DataSourceConfig::from_json_str(r#"{"reuse_identifier": ""}"#).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
        }

        #[test]
        fn missing_file_is_io_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = DataSourceConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Io(_)));
        }

        #[test]
        fn toml_file_loads() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("source.toml");
            std::fs::write(&path, "deselect_on_selection = false\nreuse_identifier = \"Row\"\n")
                .unwrap();
            let config = DataSourceConfig::from_toml_file(&path).unwrap();
            assert!(!config.deselect_on_selection);
            assert_eq!(config.reuse_identifier, "Row");
        }
    }
}
