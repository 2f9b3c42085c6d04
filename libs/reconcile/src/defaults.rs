//! Layered defaults profiles for node agents.
//!
//! Three profiles exist: [`base`], merged into every agent first, and one
//! platform profile ([`linux`] or [`windows`]) merged second. The merge
//! never overwrites a set field, so the base profile wins every field it
//! defines: a platform value for such a field is inert and only takes
//! effect if base stops defining it. Callers that need a field to differ
//! per platform must leave it out of base.
//!
//! Each function returns a fresh literal. Profiles are never shared
//! between passes, so a pass mutating its merged copy cannot be observed
//! by a concurrent pass.

use std::collections::BTreeMap;

use logfleet_model::{
    BufferStorage, CloudMetadataFilter, ForwardOptions, NodeAgent, Security, TailInput,
    Toleration, WorkloadOverrides,
};
use serde_json::json;

/// Component identity, used in the fixed label pair on every managed
/// object.
pub const COMPONENT_NAME: &str = "fluentbit";

/// Name of the collector container inside the daemon's pods.
pub const CONTAINER_NAME: &str = "fluent-bit";

/// Collector image applied when the workload overrides do not name one.
pub const DEFAULT_AGENT_IMAGE: &str = "fluent/fluent-bit:1.6.8";

/// Port of the collector's built-in HTTP server.
pub const DEFAULT_METRICS_PORT: u16 = 2020;

/// File name of the rendered configuration inside the config secret.
pub const CONFIG_FILE_NAME: &str = "fluent-bit.conf";

/// Defaults merged into every node agent, regardless of platform.
pub fn base() -> NodeAgent {
    NodeAgent {
        flush_interval_secs: Some(1),
        grace_period_secs: Some(5),
        log_level: Some("info".to_string()),
        coroutine_stack_size: Some(24576),
        container_log_mount_path: Some("/var/lib/docker/containers".to_string()),
        workload: Some(WorkloadOverrides {
            image: Some(DEFAULT_AGENT_IMAGE.to_string()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            resources: Some(json!({
                "limits": {"memory": "100M", "cpu": "200m"},
                "requests": {"memory": "50M", "cpu": "100m"},
            })),
            liveness_probe: Some(json!({
                "httpGet": {
                    "path": "/api/v1/metrics/prometheus",
                    "port": DEFAULT_METRICS_PORT,
                },
                "initialDelaySeconds": 10,
                "periodSeconds": 10,
                "failureThreshold": 3,
            })),
            ..WorkloadOverrides::default()
        }),
        tail: TailInput {
            path: Some("/var/log/containers/*.log".to_string()),
            refresh_interval: Some("5".to_string()),
            skip_long_lines: Some("On".to_string()),
            db: Some("/tail-db/tail-containers-state.db".to_string()),
            mem_buf_limit: Some("5MB".to_string()),
            tag: Some("kubernetes.*".to_string()),
        },
        security: Some(Security {
            rbac_create: Some(true),
            security_context: Some(json!({})),
            pod_security_context: Some(json!({})),
            ..Security::default()
        }),
        storage: BufferStorage {
            path: Some("/buffers".to_string()),
            ..BufferStorage::default()
        },
        cloud_metadata: Some(CloudMetadataFilter {
            imds_version: Some("v2".to_string()),
            availability_zone: Some(true),
            instance_id: Some(true),
            instance_type: Some(false),
            private_ip: Some(false),
            ami_id: Some(false),
            account_id: Some(false),
            hostname: Some(false),
            vpc_id: Some(false),
            match_pattern: Some("*".to_string()),
        }),
        forward: Some(ForwardOptions {
            retry_limit: Some("False".to_string()),
            ..ForwardOptions::default()
        }),
        ..NodeAgent::default()
    }
}

/// Linux platform profile.
pub fn linux() -> NodeAgent {
    NodeAgent {
        flush_interval_secs: Some(3),
        ..NodeAgent::default()
    }
}

/// Windows platform profile.
pub fn windows() -> NodeAgent {
    NodeAgent {
        flush_interval_secs: Some(2),
        container_log_mount_path: Some("C:\\ProgramData\\docker".to_string()),
        workload: Some(WorkloadOverrides {
            node_selector: BTreeMap::from([(
                "kubernetes.io/os".to_string(),
                "windows".to_string(),
            )]),
            tolerations: vec![Toleration {
                key: "os".to_string(),
                operator: "Equal".to_string(),
                value: "windows".to_string(),
                effect: "NoSchedule".to_string(),
            }],
            ..WorkloadOverrides::default()
        }),
        ..NodeAgent::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use logfleet_merge::Merge;
    use logfleet_model::Platform;

    fn merged(mut agent: NodeAgent) -> NodeAgent {
        agent.merge_from(&base());
        match agent.platform() {
            Platform::Windows => agent.merge_from(&windows()),
            Platform::Linux => agent.merge_from(&linux()),
        }
        agent
    }

    #[test]
    fn test_profiles_are_fresh_literals() {
        assert_eq!(base(), base());
        assert_eq!(windows(), windows());
    }

    #[test]
    fn test_empty_spec_carries_base_values_verbatim() {
        let agent = merged(NodeAgent {
            name: "general".to_string(),
            ..NodeAgent::default()
        });

        assert_eq!(agent.flush_interval_secs, Some(1));
        assert_eq!(agent.grace_period_secs, Some(5));
        assert_eq!(agent.log_level.as_deref(), Some("info"));
        assert_eq!(agent.coroutine_stack_size, Some(24576));
        assert_eq!(agent.storage.path.as_deref(), Some("/buffers"));
        assert_eq!(
            agent.tail.path.as_deref(),
            Some("/var/log/containers/*.log")
        );
        assert_eq!(
            agent.workload.as_ref().and_then(|w| w.image.as_deref()),
            Some(DEFAULT_AGENT_IMAGE)
        );
        assert_eq!(
            agent.security.as_ref().and_then(|s| s.rbac_create),
            Some(true)
        );
    }

    #[test]
    fn test_base_wins_fields_both_profiles_define() {
        // Base is merged first and first-write-wins, so the platform
        // flush intervals and the Windows mount path are inert.
        let linux_agent = merged(NodeAgent {
            name: "l".to_string(),
            ..NodeAgent::default()
        });
        let windows_agent = merged(NodeAgent {
            name: "w".to_string(),
            platform: "windows".to_string(),
            ..NodeAgent::default()
        });

        assert_eq!(linux_agent.flush_interval_secs, Some(1));
        assert_eq!(windows_agent.flush_interval_secs, Some(1));
        assert_eq!(
            windows_agent.container_log_mount_path.as_deref(),
            Some("/var/lib/docker/containers")
        );
    }

    #[test]
    fn test_user_node_selector_survives_windows_profile() {
        let agent = merged(NodeAgent {
            name: "win-pool".to_string(),
            platform: "windows".to_string(),
            workload: Some(WorkloadOverrides {
                node_selector: BTreeMap::from([(
                    "pool".to_string(),
                    "infra".to_string(),
                )]),
                ..WorkloadOverrides::default()
            }),
            ..NodeAgent::default()
        });

        let workload = agent.workload.unwrap();
        assert_eq!(
            workload.node_selector,
            BTreeMap::from([("pool".to_string(), "infra".to_string())])
        );
        // The set workload claimed the whole sub-spec.
        assert_eq!(workload.image, None);
    }

    #[test]
    fn test_user_values_never_overwritten() {
        let agent = merged(NodeAgent {
            name: "tuned".to_string(),
            flush_interval_secs: Some(30),
            log_level: Some("debug".to_string()),
            ..NodeAgent::default()
        });

        assert_eq!(agent.flush_interval_secs, Some(30));
        assert_eq!(agent.log_level.as_deref(), Some("debug"));
    }
}
