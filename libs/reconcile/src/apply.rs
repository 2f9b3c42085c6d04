//! The external apply primitive and the objects handed to it.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApplyError;
use crate::kind::ResourceKind;

/// Intended lifecycle stance for a managed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    /// The object must exist and match the desired manifest.
    Present,
    /// The object must not exist.
    Absent,
}

/// Signal that the current pass should stop and the caller should retry
/// the whole pass later. Not an error: the underlying resource is simply
/// still converging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requeue {
    /// Optional delay before the retry.
    pub after: Option<Duration>,
}

impl Requeue {
    /// Requeue after the given delay.
    pub fn after(delay: Duration) -> Self {
        Self { after: Some(delay) }
    }
}

/// One desired resource produced by a factory.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    pub kind: ResourceKind,

    /// Qualified name, `<stack>-<agent>-<suffix>`.
    pub name: String,

    /// Selector labels; also used to group the stack's objects for
    /// garbage collection.
    pub labels: BTreeMap<String, String>,

    /// Kind-specific body, in the resource store's native schema.
    pub manifest: serde_json::Value,
}

/// The external primitive that converges one live object toward a
/// desired object.
///
/// Implementations must be idempotent: applying an unchanged desired
/// object with no external drift performs no side effects and reports no
/// requeue. A returned [`Requeue`] means the live object has not reached
/// steady state yet and the whole pass should be retried later.
#[async_trait]
pub trait ResourceApplier: Send + Sync {
    async fn apply(
        &self,
        object: &ManagedObject,
        state: DesiredState,
    ) -> Result<Option<Requeue>, ApplyError>;
}
