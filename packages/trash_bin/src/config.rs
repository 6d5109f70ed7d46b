use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::{BinSpec, Error, Result};

/// Declarative description of a [`TrashBinManager`][crate::TrashBinManager] and the bins it
/// creates when activated through
/// [`Directory::activate_from_config()`][crate::Directory::activate_from_config].
///
/// # Example
///
/// ```
/// use trash_bin::ManagerConfig;
///
/// let config = ManagerConfig::from_toml_str(
///     r#"
///     unique_name = "trash-bin"
///
///     [[bins]]
///     name = "cube"
///     prefab = "prefabs/cube"
///     preload_count = 4
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.unique_name, "trash-bin");
/// assert_eq!(config.bins[0].preload_count, 4);
/// assert!(!config.bins[0].has_own_root);
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct ManagerConfig {
    /// The name under which the manager is registered. Must not be empty.
    pub unique_name: String,

    /// The bins to create when the manager is activated, in creation order.
    #[serde(default)]
    pub bins: Vec<BinConfig>,
}

/// Declarative description of one bin of a [`ManagerConfig`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct BinConfig {
    /// The name of the bin, unique within the manager.
    pub name: String,

    /// A key that identifies the prefab to instantiate. Resolved by the caller.
    pub prefab: String,

    /// How many objects to create eagerly. Defaults to one.
    #[serde(default = "default_preload_count")]
    pub preload_count: usize,

    /// Whether the bin parks its free objects under a dedicated root. Defaults to `false`.
    #[serde(default)]
    pub has_own_root: bool,
}

fn default_preload_count() -> usize {
    BinSpec::<()>::DEFAULT_PRELOAD_COUNT
}

impl ManagerConfig {
    /// Parses a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the document is not valid TOML, does not match the
    /// expected shape or describes an invalid manager (see [`validate()`][Self::validate]).
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document).map_err(|error| {
            tracing::error!(%error, "manager configuration is not valid");
            Error::InvalidConfig {
                problem: error.to_string(),
            }
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Reads and parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadConfig`] if the file cannot be read, otherwise the same errors as
    /// [`from_toml_str()`][Self::from_toml_str].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let document = std::fs::read_to_string(path).map_err(|source| {
            tracing::error!(
                path = %path.display(),
                error = %source,
                "cannot read manager configuration"
            );
            Error::ReadConfig {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Self::from_toml_str(&document)
    }

    /// Checks that the manager name is not empty and that no two bins share a name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyManagerName`] or [`Error::InvalidConfig`] describing the first
    /// problem found.
    pub fn validate(&self) -> Result<()> {
        if self.unique_name.is_empty() {
            tracing::error!("configured manager has an empty name");
            return Err(Error::EmptyManagerName);
        }

        let mut names = BTreeSet::new();

        for bin in &self.bins {
            if bin.name.is_empty() {
                tracing::error!(manager = %self.unique_name, "configured bin has an empty name");
                return Err(Error::InvalidConfig {
                    problem: "every bin must have a non-empty name".to_string(),
                });
            }

            if !names.insert(bin.name.as_str()) {
                tracing::error!(
                    manager = %self.unique_name,
                    bin = %bin.name,
                    "configured bin name is used more than once"
                );
                return Err(Error::InvalidConfig {
                    problem: format!("bin name '{}' is used more than once", bin.name),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged_errors(f: impl FnOnce()) -> String {
        let log = CapturedLog::default();
        let writer = log.clone();

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::ERROR)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = log.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = ManagerConfig::from_toml_str(
            r#"
            unique_name = "trash-bin"

            [[bins]]
            name = "cube"
            prefab = "cube"
            "#,
        )
        .unwrap();

        let bin = config.bins.first().unwrap();
        assert_eq!(bin.preload_count, 1);
        assert!(!bin.has_own_root);
    }

    #[test]
    fn manager_without_bins_is_valid() {
        let config = ManagerConfig::from_toml_str(r#"unique_name = "empty""#).unwrap();
        assert!(config.bins.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = ManagerConfig::from_toml_str(
            r#"
            unique_name = "trash-bin"
            destroy_on_load = true
            "#,
        );

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn empty_manager_name_is_rejected() {
        let result = ManagerConfig::from_toml_str(r#"unique_name = """#);
        assert!(matches!(result, Err(Error::EmptyManagerName)));
    }

    #[test]
    fn duplicate_bin_names_are_rejected() {
        let result = ManagerConfig::from_toml_str(
            r#"
            unique_name = "trash-bin"

            [[bins]]
            name = "cube"
            prefab = "a"

            [[bins]]
            name = "cube"
            prefab = "b"
            "#,
        );

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = ManagerConfig::from_toml_file("/definitely/not/here/trash_bin.toml");
        assert!(matches!(result, Err(Error::ReadConfig { .. })));
    }

    #[test]
    fn validation_failures_are_logged() {
        let config = ManagerConfig {
            unique_name: "trash-bin".to_string(),
            bins: vec![
                BinConfig {
                    name: "cube".to_string(),
                    prefab: "a".to_string(),
                    preload_count: 1,
                    has_own_root: false,
                },
                BinConfig {
                    name: "cube".to_string(),
                    prefab: "b".to_string(),
                    preload_count: 1,
                    has_own_root: false,
                },
            ],
        };

        let log = logged_errors(|| assert!(config.validate().is_err()));
        assert!(log.contains("configured bin name is used more than once"));

        let unnamed = ManagerConfig {
            unique_name: String::new(),
            bins: Vec::new(),
        };

        let log = logged_errors(|| assert!(unnamed.validate().is_err()));
        assert!(log.contains("configured manager has an empty name"));
    }
}
