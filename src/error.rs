/// Crate-level error types for nixdomain.
use std::path::PathBuf;

/// Fatal errors. Anything a documentation author can get wrong inside a
/// document is a [`crate::diagnostics::Diagnostic`] instead, so the build keeps going.
#[allow(clippy::error_impl_error, reason = "crate-level error type")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A string that had to name an attribute path contained no segment at all.
    #[error("empty attribute path: `{raw}`")]
    EmptyPath {
        /// The raw text that was split.
        raw: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// An object-store file exists but is not a valid object description.
    #[error("object store corrupt: {}: {reason}", path.display())]
    ObjectsCorrupt {
        /// The offending JSON file.
        path: PathBuf,
        /// Description of the deserialization failure.
        reason: String,
    },

    /// A configured object-store file does not exist on disk.
    #[error("object store not found: {}", path.display())]
    ObjectsNotFound {
        /// Path to the missing JSON file.
        path: PathBuf,
    },

    /// TOML deserialization of `nixdomain.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// An entity kind name that is not `option`, `function` or `package`.
    #[error("unknown entity kind: `{name}`")]
    UnknownKind {
        /// The name as given.
        name: String,
    },

    /// A reference role name that is not one of the `nix:` roles.
    #[error("unknown role: `{name}`")]
    UnknownRole {
        /// The name as given.
        name: String,
    },
}
