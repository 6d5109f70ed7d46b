use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by trash bin managers and the directory.
///
/// None of these are fatal. Every failing operation leaves the directory, its managers and
/// their bins in the same state they were in before the call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A manager was activated with an empty unique name.
    #[error("a trash bin manager must have a non-empty unique name")]
    EmptyManagerName,

    /// A manager was activated with a name that another active manager already uses.
    #[error("the trash bin manager name '{name}' is already in use")]
    DuplicateManagerName {
        /// The name that was already taken.
        name: String,
    },

    /// No active manager has the requested name.
    #[error("trash bin manager '{name}' not found")]
    ManagerNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// A bin was created with a name that another bin of the same manager already uses.
    #[error("trash bin manager '{manager}' already has a bin named '{bin}'")]
    DuplicateBin {
        /// The manager that owns the existing bin.
        manager: String,

        /// The name that was already taken.
        bin: String,
    },

    /// The manager has no bin with the requested name.
    #[error("trash bin manager '{manager}' has no bin named '{bin}'")]
    BinNotFound {
        /// The manager that was searched.
        manager: String,

        /// The name that was looked up.
        bin: String,
    },

    /// A bin configuration referenced a prefab that the caller could not resolve.
    #[error("bin '{bin}' references unknown prefab '{prefab}'")]
    UnknownPrefab {
        /// The bin whose configuration referenced the prefab.
        bin: String,

        /// The unresolved prefab key.
        prefab: String,
    },

    /// A configuration document could not be parsed.
    #[error("invalid trash bin configuration: {problem}")]
    InvalidConfig {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// A configuration file could not be read.
    #[error("failed to read trash bin configuration from '{}'", .path.display())]
    ReadConfig {
        /// The file that could not be read.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized `Result` type for trash bin operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
