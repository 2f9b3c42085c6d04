//! Node agent configuration tree.
//!
//! A [`NodeAgent`] is a partially populated tree. The reconciliation
//! engine layers defaults into it with [`Merge::merge_from`]: optional
//! sub-specs are atomic (a set sub-spec is never descended into), plain
//! sub-specs merge field by field, and collections fill wholesale.

use std::collections::BTreeMap;

use logfleet_merge::{fill, fill_map, Merge};
use serde::{Deserialize, Serialize};

/// Platform a node agent runs on, derived from the discriminator string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
}

/// One per-node collection agent, partially specified by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAgent {
    /// Entry name; identifies the agent and is never defaulted.
    pub name: String,

    /// Platform discriminator. Exactly `"windows"` selects the Windows
    /// defaults profile; any other value, including empty, selects Linux.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform: String,

    /// The agent's own labels, folded into every managed object's label
    /// set.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// How often buffered records are flushed downstream, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_interval_secs: Option<u32>,

    /// How long the agent waits for in-flight data on shutdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_secs: Option<u32>,

    /// Agent log verbosity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Stack size for the agent's coroutine engine, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coroutine_stack_size: Option<u32>,

    /// Host path where the container runtime keeps container logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_log_mount_path: Option<String>,

    /// Daemon workload overrides. Atomic: setting any field here claims
    /// the whole sub-spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<WorkloadOverrides>,

    /// Log collection input settings, merged field by field.
    #[serde(default)]
    pub tail: TailInput,

    /// Security settings. Atomic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Security>,

    /// Disk buffer settings, merged field by field.
    #[serde(default)]
    pub storage: BufferStorage,

    /// Cloud metadata enrichment filter. Atomic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_metadata: Option<CloudMetadataFilter>,

    /// Forwarding output options. Atomic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<ForwardOptions>,

    /// Metrics exposure. Atomic; unset disables the metrics service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

impl NodeAgent {
    /// Resolve the platform discriminator.
    pub fn platform(&self) -> Platform {
        match self.platform.as_str() {
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }
}

impl Merge for NodeAgent {
    fn merge_from(&mut self, defaults: &Self) {
        // `name` and `platform` identify the entry and are never filled
        // from a profile.
        fill_map(&mut self.labels, &defaults.labels);
        fill(&mut self.flush_interval_secs, &defaults.flush_interval_secs);
        fill(&mut self.grace_period_secs, &defaults.grace_period_secs);
        fill(&mut self.log_level, &defaults.log_level);
        fill(&mut self.coroutine_stack_size, &defaults.coroutine_stack_size);
        fill(
            &mut self.container_log_mount_path,
            &defaults.container_log_mount_path,
        );
        fill(&mut self.workload, &defaults.workload);
        self.tail.merge_from(&defaults.tail);
        fill(&mut self.security, &defaults.security);
        self.storage.merge_from(&defaults.storage);
        fill(&mut self.cloud_metadata, &defaults.cloud_metadata);
        fill(&mut self.forward, &defaults.forward);
        fill(&mut self.metrics, &defaults.metrics);
    }
}

/// Overrides for the daemon workload that runs the agent on every node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadOverrides {
    /// Restricts the daemon to nodes matching these labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Tolerations attached to the daemon's pods.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    /// Agent container image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image pull policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Container resource requirements, in the resource store's native
    /// schema. Must be a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<serde_json::Value>,

    /// Container liveness probe fragment. Must be a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<serde_json::Value>,
}

/// One scheduling toleration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Toleration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operator: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub effect: String,
}

/// Container log tailing input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TailInput {
    /// Glob of log files to tail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Seconds between refreshes of the watched file list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<String>,

    /// Whether lines over the buffer limit are skipped (`On`/`Off`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_long_lines: Option<String>,

    /// Position database path, tracking per-file read offsets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Memory limit for buffered records from this input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_buf_limit: Option<String>,

    /// Tag prefix stamped on collected records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Merge for TailInput {
    fn merge_from(&mut self, defaults: &Self) {
        fill(&mut self.path, &defaults.path);
        fill(&mut self.refresh_interval, &defaults.refresh_interval);
        fill(&mut self.skip_long_lines, &defaults.skip_long_lines);
        fill(&mut self.db, &defaults.db);
        fill(&mut self.mem_buf_limit, &defaults.mem_buf_limit);
        fill(&mut self.tag, &defaults.tag);
    }
}

/// Security settings for the agent workload and its access control
/// objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Security {
    /// Existing service account to run as. When set, the engine does not
    /// manage a service account of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Whether role-based access control objects are created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac_create: Option<bool>,

    /// Whether pod security policy objects are created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security_policy_create: Option<bool>,

    /// Container security context fragment. Must be a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<serde_json::Value>,

    /// Pod security context fragment. Must be a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security_context: Option<serde_json::Value>,
}

/// Disk buffer settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferStorage {
    /// Directory where buffered chunks are stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Synchronization mode for chunk writes (`normal`/`full`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<String>,

    /// Whether chunk checksums are verified (`On`/`Off`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Memory limit for chunks queued from disk after a restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlog_mem_limit: Option<String>,
}

impl Merge for BufferStorage {
    fn merge_from(&mut self, defaults: &Self) {
        fill(&mut self.path, &defaults.path);
        fill(&mut self.sync, &defaults.sync);
        fill(&mut self.checksum, &defaults.checksum);
        fill(&mut self.backlog_mem_limit, &defaults.backlog_mem_limit);
    }
}

/// Cloud metadata enrichment: which instance metadata fields are attached
/// to collected records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudMetadataFilter {
    /// Instance metadata service protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imds_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ami_id: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<bool>,

    /// Record tag pattern the filter applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_pattern: Option<String>,
}

/// Options for the forwarding output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardOptions {
    /// Retry limit for failed chunks (`False` disables the limit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_limit: Option<String>,

    /// Whether delivery requires an acknowledgment from the aggregator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_ack_response: Option<bool>,

    /// Timeout for sending a chunk, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_timeout_secs: Option<u32>,
}

/// Metrics exposure for the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Port the agent's built-in HTTP server listens on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Scrape path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Scrape interval, e.g. `"15s"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    /// Scrape timeout, e.g. `"5s"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Whether a scrape monitor object is created alongside the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_monitor: Option<bool>,
}
