//! The top-level declarative object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::NodeAgent;

/// A named logging deployment: the parent resource that owns an ordered
/// collection of node agents.
///
/// Entry order is significant. Agents are reconciled in declared order,
/// and the first entry that requeues or fails stops the rest of the pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingStack {
    /// Stack name; the first component of every managed object's name.
    pub name: String,

    /// Namespace that holds the stack's namespaced objects and the
    /// service accounts referenced by cluster-scoped bindings.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub control_namespace: String,

    /// Labels inherited by all managed objects.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Node agent entries, in reconciliation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_agents: Vec<NodeAgent>,
}
