//! Error types for rr-cache
//!
//! All modules use `CacheResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rr-cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Acquisition step that was attempted for an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Local persisted copy
    Local,
    /// Pre-built remote copy
    Remote,
    /// Rebuild from raw sources
    Rebuild,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Rebuild => "rebuild",
        };
        write!(f, "{}", name)
    }
}

/// Renders the attempted steps as `local -> remote -> rebuild`
fn steps_display(steps: &[Step]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// All errors that can occur in rr-cache
#[derive(Error, Debug)]
pub enum CacheError {
    // Resolution errors
    #[error("Unknown artifact: {0}")]
    UnknownArtifact(String),

    #[error("Cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("Artifact {name} is unresolvable (tried {}): {source}", steps_display(attempted))]
    Unresolvable {
        name: String,
        attempted: Vec<Step>,
        #[source]
        source: Box<CacheError>,
    },

    // Integrity errors
    #[error("Fingerprint mismatch for {name}: expected {expected}, got {actual}")]
    FingerprintMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    // Collaborator errors
    #[error("Transfer failed for {url}: {reason}")]
    TransferFailed { url: String, reason: String },

    #[error("Raw source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("No build transform registered for {0}")]
    NoBuildTransform(String),

    #[error("Build of {name} failed: {reason}")]
    BuildFailed { name: String, reason: String },

    // Lookup errors
    #[error("{kind} has no entity {id}")]
    NotFound { kind: String, id: String },

    #[error("Artifact not loaded: {0}")]
    NotLoaded(String),

    // Descriptor and configuration errors
    #[error("Invalid registry entry {entry}: {reason}")]
    RegistryInvalid { entry: String, reason: String },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decode {file}: {reason}")]
    Decode { file: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transfer error for a URL
    pub fn transfer(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::TransferFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a build failure for an artifact
    pub fn build(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::BuildFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap a fatal cause as an unresolvable artifact
    pub fn unresolvable(name: impl Into<String>, attempted: Vec<Step>, cause: CacheError) -> Self {
        Self::Unresolvable {
            name: name.into(),
            attempted,
            source: Box::new(cause),
        }
    }

    /// Check if the error triggers a fallback instead of aborting a load
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TransferFailed { .. } | Self::FingerprintMismatch { .. }
        )
    }

    /// Name of the missing raw source behind an unresolvable artifact
    pub fn missing_source(&self) -> Option<&str> {
        match self {
            Self::SourceUnavailable(file) => Some(file),
            Self::Unresolvable { source, .. } => source.missing_source(),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownArtifact(_) => Some("Run: rr-cache registry"),
            Self::CyclicDependency { .. } => {
                Some("The registry descriptor declares a dependency loop; fix its attr_deps")
            }
            Self::Unresolvable { source, .. } => match source.as_ref() {
                Self::SourceUnavailable(_) => {
                    Some("Place the raw file in the input-cache directory or add a URL for it")
                }
                Self::FingerprintMismatch { .. } => {
                    Some("Set cache.strict_rebuild = false to accept rebuilt fingerprints")
                }
                _ => None,
            },
            Self::NotLoaded(_) => Some("Load the artifact first: rr-cache load <name>"),
            _ => None,
        }
    }
}
