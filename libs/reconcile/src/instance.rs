//! One node agent mid-pass: the merged spec, its parent stack, and the
//! pipeline that walks the ordered factory list.

use std::collections::BTreeMap;

use logfleet_model::{LoggingStack, NodeAgent, Security};
use tracing::debug;

use crate::apply::{DesiredState, ManagedObject, Requeue, ResourceApplier};
use crate::defaults::COMPONENT_NAME;
use crate::error::{BuildError, ReconcileError, ReconcileResult};
use crate::kind::ResourceKind;

/// A node agent with defaults merged in, bound to its parent stack and
/// the apply primitive for the duration of one pass.
pub(crate) struct NodeAgentInstance<'a, A> {
    pub(crate) agent: NodeAgent,
    pub(crate) stack: &'a LoggingStack,
    pub(crate) applier: &'a A,
}

impl<'a, A> NodeAgentInstance<'a, A> {
    /// Deterministic object name: `<stack>-<agent>-<suffix>`.
    pub(crate) fn qualified_name(&self, suffix: &str) -> String {
        format!("{}-{}-{}", self.stack.name, self.agent.name, suffix)
    }

    /// Selector labels for every managed object of this instance: the
    /// agent's own labels, the fixed identity pair, and the owning
    /// stack's association label. Fixed labels win collisions.
    pub(crate) fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.agent.labels.clone();
        labels.insert(
            "app.kubernetes.io/name".to_string(),
            COMPONENT_NAME.to_string(),
        );
        labels.insert(
            "app.kubernetes.io/instance".to_string(),
            self.agent.name.clone(),
        );
        labels.insert(
            "app.kubernetes.io/managed-by".to_string(),
            self.stack.name.clone(),
        );
        labels
    }

    pub(crate) fn security(&self) -> Option<&Security> {
        self.agent.security.as_ref()
    }

    /// Service account the daemon runs as: a user-supplied account wins
    /// over the managed one.
    pub(crate) fn service_account_name(&self) -> String {
        self.security()
            .and_then(|s| s.service_account_name.clone())
            .unwrap_or_else(|| self.qualified_name(ResourceKind::ServiceAccount.suffix()))
    }

    /// Dispatch to the factory for one resource kind.
    pub(crate) fn build(
        &self,
        kind: ResourceKind,
    ) -> Result<(ManagedObject, DesiredState), BuildError> {
        match kind {
            ResourceKind::ServiceAccount => self.service_account(),
            ResourceKind::ClusterRole => self.cluster_role(),
            ResourceKind::ClusterRoleBinding => self.cluster_role_binding(),
            ResourceKind::PodSecurityPolicy => self.pod_security_policy(),
            ResourceKind::PspClusterRole => self.psp_cluster_role(),
            ResourceKind::PspClusterRoleBinding => self.psp_cluster_role_binding(),
            ResourceKind::ConfigSecret => self.config_secret(),
            ResourceKind::DaemonSet => self.daemon_set(),
            ResourceKind::MetricsService => self.metrics_service(),
            ResourceKind::MetricsServiceMonitor => self.metrics_service_monitor(),
        }
    }

    /// Wrap a manifest body into a managed object of the given kind.
    pub(crate) fn object(&self, kind: ResourceKind, manifest: serde_json::Value) -> ManagedObject {
        ManagedObject {
            kind,
            name: self.qualified_name(kind.suffix()),
            labels: self.labels(),
            manifest,
        }
    }
}

impl<'a, A: ResourceApplier> NodeAgentInstance<'a, A> {
    /// Walk the ordered factory list, applying each desired object.
    ///
    /// The pass aborts at the first build error, apply error, or requeue
    /// signal; factories after the aborting one are not invoked and will
    /// be attempted again on the next pass.
    pub(crate) async fn reconcile(&self) -> ReconcileResult<Option<Requeue>> {
        for kind in ResourceKind::ORDERED {
            let (object, state) = self
                .build(kind)
                .map_err(|source| ReconcileError::Build { kind, source })?;

            debug!(kind = %kind, name = %object.name, state = ?state, "applying desired object");
            let requeue = self
                .applier
                .apply(&object, state)
                .await
                .map_err(|source| ReconcileError::Apply {
                    kind,
                    name: object.name.clone(),
                    source,
                })?;

            if let Some(requeue) = requeue {
                debug!(kind = %kind, name = %object.name, "resource still converging, stopping pass");
                return Ok(Some(requeue));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The naming and label helpers never touch the applier, so a unit
    // applier is enough here.
    fn instance<'a>(
        agent: NodeAgent,
        stack: &'a LoggingStack,
        applier: &'a (),
    ) -> NodeAgentInstance<'a, ()> {
        NodeAgentInstance {
            agent,
            stack,
            applier,
        }
    }

    #[test]
    fn test_qualified_name_format() {
        let stack = LoggingStack {
            name: "acme".to_string(),
            ..LoggingStack::default()
        };
        let applier = ();
        let inst = instance(
            NodeAgent {
                name: "general".to_string(),
                ..NodeAgent::default()
            },
            &stack,
            &applier,
        );
        assert_eq!(inst.qualified_name("fluentbit"), "acme-general-fluentbit");
    }

    #[test]
    fn test_fixed_labels_win_collisions() {
        let stack = LoggingStack {
            name: "acme".to_string(),
            ..LoggingStack::default()
        };
        let applier = ();
        let inst = instance(
            NodeAgent {
                name: "general".to_string(),
                labels: BTreeMap::from([
                    ("app.kubernetes.io/name".to_string(), "spoofed".to_string()),
                    ("team".to_string(), "core".to_string()),
                ]),
                ..NodeAgent::default()
            },
            &stack,
            &applier,
        );

        let labels = inst.labels();
        assert_eq!(
            labels.get("app.kubernetes.io/name").map(String::as_str),
            Some(COMPONENT_NAME)
        );
        assert_eq!(
            labels.get("app.kubernetes.io/instance").map(String::as_str),
            Some("general")
        );
        assert_eq!(
            labels.get("app.kubernetes.io/managed-by").map(String::as_str),
            Some("acme")
        );
        assert_eq!(labels.get("team").map(String::as_str), Some("core"));
    }

    #[test]
    fn test_service_account_name_prefers_user_override() {
        let stack = LoggingStack {
            name: "acme".to_string(),
            ..LoggingStack::default()
        };
        let applier = ();
        let inst = instance(
            NodeAgent {
                name: "general".to_string(),
                security: Some(Security {
                    service_account_name: Some("audited".to_string()),
                    ..Security::default()
                }),
                ..NodeAgent::default()
            },
            &stack,
            &applier,
        );
        assert_eq!(inst.service_account_name(), "audited");

        let inst = instance(
            NodeAgent {
                name: "general".to_string(),
                ..NodeAgent::default()
            },
            &stack,
            &applier,
        );
        assert_eq!(inst.service_account_name(), "acme-general-fluentbit");
    }
}
