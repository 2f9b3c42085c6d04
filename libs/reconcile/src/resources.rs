//! Desired-object factories, one per managed resource kind.
//!
//! Every factory is a pure function of the merged instance: it derives
//! the object's qualified name and label set, renders the kind-specific
//! manifest body, and computes the object's desired state from the
//! spec's toggles. Conditional resources are emitted as `Absent` rather
//! than skipped, so a disabled toggle also cleans up objects left over
//! from an earlier configuration.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

use crate::agent_config::{config_checksum, metrics_port, render_agent_config};
use crate::apply::{DesiredState, ManagedObject};
use crate::defaults::{CONFIG_FILE_NAME, CONTAINER_NAME, DEFAULT_AGENT_IMAGE};
use crate::error::BuildError;
use crate::instance::NodeAgentInstance;
use crate::kind::ResourceKind;

/// Pod annotation carrying the rendered-config checksum; a changed
/// config rolls the daemon's pods.
const CONFIG_CHECKSUM_ANNOTATION: &str = "logfleet.io/config-checksum";

type Built = Result<(ManagedObject, DesiredState), BuildError>;

impl<'a, A> NodeAgentInstance<'a, A> {
    fn rbac_enabled(&self) -> bool {
        self.security()
            .and_then(|s| s.rbac_create)
            .unwrap_or(false)
    }

    fn psp_enabled(&self) -> bool {
        self.rbac_enabled()
            && self
                .security()
                .and_then(|s| s.pod_security_policy_create)
                .unwrap_or(false)
    }

    pub(crate) fn service_account(&self) -> Built {
        // A user-supplied account means the managed one must go away.
        let state = if self
            .security()
            .and_then(|s| s.service_account_name.as_ref())
            .is_some()
        {
            DesiredState::Absent
        } else {
            DesiredState::Present
        };
        let manifest = json!({
            "automountServiceAccountToken": true,
        });
        Ok((self.object(ResourceKind::ServiceAccount, manifest), state))
    }

    pub(crate) fn cluster_role(&self) -> Built {
        let manifest = json!({
            "rules": [{
                "apiGroups": [""],
                "resources": ["pods", "namespaces"],
                "verbs": ["get", "list", "watch"],
            }],
        });
        Ok((
            self.object(ResourceKind::ClusterRole, manifest),
            present_if(self.rbac_enabled()),
        ))
    }

    pub(crate) fn cluster_role_binding(&self) -> Built {
        let manifest = json!({
            "roleRef": {
                "apiGroup": "rbac.authorization.k8s.io",
                "kind": "ClusterRole",
                "name": self.qualified_name(ResourceKind::ClusterRole.suffix()),
            },
            "subjects": [{
                "kind": "ServiceAccount",
                "name": self.service_account_name(),
                "namespace": self.stack.control_namespace,
            }],
        });
        Ok((
            self.object(ResourceKind::ClusterRoleBinding, manifest),
            present_if(self.rbac_enabled()),
        ))
    }

    pub(crate) fn pod_security_policy(&self) -> Built {
        let mount_path = self.container_log_mount_path();
        let manifest = json!({
            "spec": {
                "fsGroup": {"rule": "RunAsAny"},
                "runAsUser": {"rule": "RunAsAny"},
                "seLinux": {"rule": "RunAsAny"},
                "supplementalGroups": {"rule": "RunAsAny"},
                "volumes": ["configMap", "emptyDir", "secret", "hostPath"],
                "allowedHostPaths": [
                    {"pathPrefix": mount_path, "readOnly": true},
                    {"pathPrefix": "/var/log", "readOnly": true},
                ],
                "hostNetwork": false,
            },
        });
        Ok((
            self.object(ResourceKind::PodSecurityPolicy, manifest),
            present_if(self.psp_enabled()),
        ))
    }

    pub(crate) fn psp_cluster_role(&self) -> Built {
        let manifest = json!({
            "rules": [{
                "apiGroups": ["policy"],
                "resources": ["podsecuritypolicies"],
                "resourceNames": [
                    self.qualified_name(ResourceKind::PodSecurityPolicy.suffix()),
                ],
                "verbs": ["use"],
            }],
        });
        Ok((
            self.object(ResourceKind::PspClusterRole, manifest),
            present_if(self.psp_enabled()),
        ))
    }

    pub(crate) fn psp_cluster_role_binding(&self) -> Built {
        let manifest = json!({
            "roleRef": {
                "apiGroup": "rbac.authorization.k8s.io",
                "kind": "ClusterRole",
                "name": self.qualified_name(ResourceKind::PspClusterRole.suffix()),
            },
            "subjects": [{
                "kind": "ServiceAccount",
                "name": self.service_account_name(),
                "namespace": self.stack.control_namespace,
            }],
        });
        Ok((
            self.object(ResourceKind::PspClusterRoleBinding, manifest),
            present_if(self.psp_enabled()),
        ))
    }

    pub(crate) fn config_secret(&self) -> Built {
        let config = render_agent_config(&self.agent);
        let manifest = json!({
            "type": "Opaque",
            "data": {
                CONFIG_FILE_NAME: BASE64.encode(config.as_bytes()),
            },
        });
        Ok((
            self.object(ResourceKind::ConfigSecret, manifest),
            DesiredState::Present,
        ))
    }

    pub(crate) fn daemon_set(&self) -> Built {
        let workload = self.agent.workload.clone().unwrap_or_default();
        let resources = fragment(workload.resources.as_ref(), "workload.resources")?;
        let probe = fragment(workload.liveness_probe.as_ref(), "workload.liveness_probe")?;
        let (security_context, pod_security_context) = match self.security() {
            Some(s) => (
                fragment(s.security_context.as_ref(), "security.security_context")?,
                fragment(
                    s.pod_security_context.as_ref(),
                    "security.pod_security_context",
                )?,
            ),
            None => (json!({}), json!({})),
        };

        let labels = self.labels();
        let mount_path = self.container_log_mount_path();
        let buffer_path = self.agent.storage.path.as_deref().unwrap_or("/buffers");
        let port = metrics_port(&self.agent);

        let mut container = json!({
            "name": CONTAINER_NAME,
            "image": workload.image.as_deref().unwrap_or(DEFAULT_AGENT_IMAGE),
            "imagePullPolicy": workload
                .image_pull_policy
                .as_deref()
                .unwrap_or("IfNotPresent"),
            "ports": [{"name": "metrics", "containerPort": port, "protocol": "TCP"}],
            "volumeMounts": [
                {"name": "containers", "mountPath": mount_path, "readOnly": true},
                {"name": "varlogs", "mountPath": "/var/log", "readOnly": true},
                {"name": "buffers", "mountPath": buffer_path},
                {"name": "positiondb", "mountPath": "/tail-db"},
                {"name": "config", "mountPath": "/fluent-bit/etc/", "readOnly": true},
            ],
        });
        insert_fragment(&mut container, "resources", resources);
        insert_fragment(&mut container, "livenessProbe", probe);
        insert_fragment(&mut container, "securityContext", security_context);

        let mut pod_spec = json!({
            "serviceAccountName": self.service_account_name(),
            "containers": [container],
            "volumes": [
                {"name": "containers", "hostPath": {"path": mount_path}},
                {"name": "varlogs", "hostPath": {"path": "/var/log"}},
                {"name": "buffers", "emptyDir": {}},
                {"name": "positiondb", "emptyDir": {}},
                {"name": "config", "secret": {
                    "secretName": self.qualified_name(ResourceKind::ConfigSecret.suffix()),
                }},
            ],
        });
        insert_fragment(&mut pod_spec, "securityContext", pod_security_context);
        if !workload.node_selector.is_empty() {
            pod_spec["nodeSelector"] = serde_json::to_value(&workload.node_selector)?;
        }
        if !workload.tolerations.is_empty() {
            pod_spec["tolerations"] = serde_json::to_value(&workload.tolerations)?;
        }

        let manifest = json!({
            "spec": {
                "selector": {"matchLabels": &labels},
                "template": {
                    "metadata": {
                        "labels": &labels,
                        "annotations": {
                            CONFIG_CHECKSUM_ANNOTATION: config_checksum(
                                &render_agent_config(&self.agent),
                            ),
                        },
                    },
                    "spec": pod_spec,
                },
            },
        });
        Ok((
            self.object(ResourceKind::DaemonSet, manifest),
            DesiredState::Present,
        ))
    }

    pub(crate) fn metrics_service(&self) -> Built {
        let port = metrics_port(&self.agent);
        let manifest = json!({
            "spec": {
                "type": "ClusterIP",
                "clusterIP": "None",
                "selector": self.labels(),
                "ports": [{
                    "name": "metrics",
                    "port": port,
                    "targetPort": port,
                    "protocol": "TCP",
                }],
            },
        });
        Ok((
            self.object(ResourceKind::MetricsService, manifest),
            present_if(self.agent.metrics.is_some()),
        ))
    }

    pub(crate) fn metrics_service_monitor(&self) -> Built {
        let metrics = self.agent.metrics.clone().unwrap_or_default();
        let manifest = json!({
            "spec": {
                "selector": {"matchLabels": self.labels()},
                "endpoints": [{
                    "port": "metrics",
                    "path": metrics
                        .path
                        .as_deref()
                        .unwrap_or("/api/v1/metrics/prometheus"),
                    "interval": metrics.interval.as_deref().unwrap_or("15s"),
                    "scrapeTimeout": metrics.timeout.as_deref().unwrap_or("5s"),
                }],
            },
        });
        let enabled =
            self.agent.metrics.is_some() && metrics.service_monitor.unwrap_or(false);
        Ok((
            self.object(ResourceKind::MetricsServiceMonitor, manifest),
            present_if(enabled),
        ))
    }

    fn container_log_mount_path(&self) -> &str {
        self.agent
            .container_log_mount_path
            .as_deref()
            .unwrap_or("/var/lib/docker/containers")
    }
}

fn present_if(enabled: bool) -> DesiredState {
    if enabled {
        DesiredState::Present
    } else {
        DesiredState::Absent
    }
}

/// Opaque override fragments must be JSON objects; anything else would
/// produce a manifest the resource store cannot accept.
fn fragment(value: Option<&Value>, field: &'static str) -> Result<Value, BuildError> {
    match value {
        None => Ok(json!({})),
        Some(value) if value.is_object() => Ok(value.clone()),
        Some(_) => Err(BuildError::InvalidFragment { field }),
    }
}

/// Insert an object fragment, skipping empty ones so the manifest stays
/// free of vacuous keys.
fn insert_fragment(target: &mut Value, key: &str, fragment: Value) {
    let non_empty = fragment.as_object().is_some_and(|m| !m.is_empty());
    if non_empty {
        target[key] = fragment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use logfleet_merge::Merge;
    use logfleet_model::{
        LoggingStack, Metrics, NodeAgent, Platform, Security, WorkloadOverrides,
    };

    use crate::defaults;

    fn stack() -> LoggingStack {
        LoggingStack {
            name: "acme".to_string(),
            control_namespace: "logging".to_string(),
            ..LoggingStack::default()
        }
    }

    fn merged(mut agent: NodeAgent) -> NodeAgent {
        agent.merge_from(&defaults::base());
        match agent.platform() {
            Platform::Windows => agent.merge_from(&defaults::windows()),
            Platform::Linux => agent.merge_from(&defaults::linux()),
        }
        agent
    }

    fn instance<'a>(agent: NodeAgent, stack: &'a LoggingStack) -> NodeAgentInstance<'a, ()> {
        NodeAgentInstance {
            agent: merged(agent),
            stack,
            applier: &(),
        }
    }

    fn agent(name: &str) -> NodeAgent {
        NodeAgent {
            name: name.to_string(),
            ..NodeAgent::default()
        }
    }

    #[test]
    fn test_service_account_present_by_default() {
        let stack = stack();
        let inst = instance(agent("general"), &stack);
        let (object, state) = inst.service_account().unwrap();
        assert_eq!(object.name, "acme-general-fluentbit");
        assert_eq!(state, DesiredState::Present);
    }

    #[test]
    fn test_service_account_absent_with_user_override() {
        let stack = stack();
        let mut spec = agent("general");
        spec.security = Some(Security {
            service_account_name: Some("audited".to_string()),
            ..Security::default()
        });
        let inst = instance(spec, &stack);

        let (_, state) = inst.service_account().unwrap();
        assert_eq!(state, DesiredState::Absent);

        // The binding points at the user's account instead.
        let (binding, _) = inst.cluster_role_binding().unwrap();
        assert_eq!(
            binding.manifest["subjects"][0]["name"],
            json!("audited")
        );
    }

    #[test]
    fn test_rbac_objects_follow_toggle() {
        let stack = stack();
        let inst = instance(agent("general"), &stack);
        let (_, state) = inst.cluster_role().unwrap();
        assert_eq!(state, DesiredState::Present);

        let mut spec = agent("general");
        spec.security = Some(Security {
            rbac_create: Some(false),
            ..Security::default()
        });
        let inst = instance(spec, &stack);
        let (_, role_state) = inst.cluster_role().unwrap();
        let (_, binding_state) = inst.cluster_role_binding().unwrap();
        assert_eq!(role_state, DesiredState::Absent);
        assert_eq!(binding_state, DesiredState::Absent);
    }

    #[test]
    fn test_psp_objects_require_both_toggles() {
        let stack = stack();

        // Base profile enables RBAC but not PSP.
        let inst = instance(agent("general"), &stack);
        let (_, state) = inst.pod_security_policy().unwrap();
        assert_eq!(state, DesiredState::Absent);

        let mut spec = agent("general");
        spec.security = Some(Security {
            rbac_create: Some(true),
            pod_security_policy_create: Some(true),
            ..Security::default()
        });
        let inst = instance(spec, &stack);
        let (psp, state) = inst.pod_security_policy().unwrap();
        assert_eq!(state, DesiredState::Present);
        assert_eq!(psp.name, "acme-general-fluentbit");

        let (role, state) = inst.psp_cluster_role().unwrap();
        assert_eq!(state, DesiredState::Present);
        assert_eq!(
            role.manifest["rules"][0]["resourceNames"][0],
            json!("acme-general-fluentbit")
        );
        assert_eq!(role.name, "acme-general-fluentbit-psp");
    }

    #[test]
    fn test_config_secret_carries_rendered_config() {
        let stack = stack();
        let inst = instance(agent("general"), &stack);
        let (object, state) = inst.config_secret().unwrap();
        assert_eq!(state, DesiredState::Present);

        let encoded = object.manifest["data"][CONFIG_FILE_NAME]
            .as_str()
            .unwrap();
        let decoded = String::from_utf8(BASE64.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, render_agent_config(&inst.agent));
    }

    #[test]
    fn test_daemon_set_defaults() {
        let stack = stack();
        let inst = instance(agent("general"), &stack);
        let (object, state) = inst.daemon_set().unwrap();
        assert_eq!(state, DesiredState::Present);
        assert_eq!(object.name, "acme-general-fluentbit");

        let template = &object.manifest["spec"]["template"];
        let container = &template["spec"]["containers"][0];
        assert_eq!(container["image"], json!(DEFAULT_AGENT_IMAGE));
        assert_eq!(
            template["spec"]["serviceAccountName"],
            json!("acme-general-fluentbit")
        );
        assert!(
            template["metadata"]["annotations"][CONFIG_CHECKSUM_ANNOTATION]
                .as_str()
                .is_some()
        );
        // Base profile has no node selector.
        assert!(template["spec"].get("nodeSelector").is_none());
        // Resource requirements from the base profile survive.
        assert_eq!(
            container["resources"]["limits"]["memory"],
            json!("100M")
        );
    }

    #[test]
    fn test_daemon_set_user_workload_overrides() {
        let stack = stack();
        let mut spec = agent("win-pool");
        spec.platform = "windows".to_string();
        spec.workload = Some(WorkloadOverrides {
            node_selector: BTreeMap::from([("pool".to_string(), "infra".to_string())]),
            ..WorkloadOverrides::default()
        });
        let inst = instance(spec, &stack);

        let (object, _) = inst.daemon_set().unwrap();
        let pod_spec = &object.manifest["spec"]["template"]["spec"];
        assert_eq!(pod_spec["nodeSelector"]["pool"], json!("infra"));
        // The set workload claimed the whole sub-spec, so the image falls
        // back to the fixed default.
        assert_eq!(
            pod_spec["containers"][0]["image"],
            json!(DEFAULT_AGENT_IMAGE)
        );
    }

    #[test]
    fn test_daemon_set_rejects_malformed_fragment() {
        let stack = stack();
        let mut spec = agent("general");
        spec.workload = Some(WorkloadOverrides {
            resources: Some(json!("not-an-object")),
            ..WorkloadOverrides::default()
        });
        let inst = instance(spec, &stack);

        let err = inst.daemon_set().unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidFragment {
                field: "workload.resources"
            }
        ));
    }

    #[test]
    fn test_metrics_objects_follow_toggles() {
        let stack = stack();

        let inst = instance(agent("general"), &stack);
        let (_, service_state) = inst.metrics_service().unwrap();
        let (_, monitor_state) = inst.metrics_service_monitor().unwrap();
        assert_eq!(service_state, DesiredState::Absent);
        assert_eq!(monitor_state, DesiredState::Absent);

        let mut spec = agent("general");
        spec.metrics = Some(Metrics {
            port: Some(9090),
            service_monitor: Some(true),
            ..Metrics::default()
        });
        let inst = instance(spec, &stack);
        let (service, service_state) = inst.metrics_service().unwrap();
        let (monitor, monitor_state) = inst.metrics_service_monitor().unwrap();
        assert_eq!(service_state, DesiredState::Present);
        assert_eq!(monitor_state, DesiredState::Present);
        assert_eq!(service.name, "acme-general-fluentbit-metrics");
        assert_eq!(service.manifest["spec"]["ports"][0]["port"], json!(9090));
        assert_eq!(
            monitor.manifest["spec"]["endpoints"][0]["interval"],
            json!("15s")
        );
    }
}
