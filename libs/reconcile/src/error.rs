//! Error types for reconciliation passes.

use thiserror::Error;

use crate::kind::ResourceKind;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors from the external apply primitive.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The live object was modified concurrently.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other failure from the resource store.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A factory could not build its desired object.
#[derive(Debug, Error)]
pub enum BuildError {
    /// An opaque override fragment has the wrong JSON shape.
    #[error("override fragment `{field}` must be a JSON object")]
    InvalidFragment { field: &'static str },

    /// Serializing part of the spec into the manifest failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fatal outcome of a reconciliation pass.
///
/// Context accumulates outward: a failed apply is wrapped with the
/// resource's kind and name, and the whole chain is wrapped with the
/// owning node agent's name. A pass has exactly one root cause.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A factory failed to construct its desired object.
    #[error("failed to build desired object for {kind}")]
    Build {
        kind: ResourceKind,
        #[source]
        source: BuildError,
    },

    /// The apply primitive failed for one resource.
    #[error("failed to apply {kind} `{name}`")]
    Apply {
        kind: ResourceKind,
        name: String,
        #[source]
        source: ApplyError,
    },

    /// A node agent's pipeline failed.
    #[error("node agent `{name}`")]
    NodeAgent {
        name: String,
        #[source]
        source: Box<ReconcileError>,
    },
}
