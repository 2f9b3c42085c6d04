//! Renders the collector configuration for a merged node agent.
//!
//! The output is the collector's classic INI-style format: a `[SERVICE]`
//! section, one tail `[INPUT]`, an optional cloud metadata `[FILTER]`,
//! and a forward `[OUTPUT]`. Rendering is deterministic for a given
//! merged spec; the daemon workload carries a checksum of the rendered
//! text so configuration drift rolls the pods.

use logfleet_model::NodeAgent;
use sha2::{Digest, Sha256};

use crate::defaults::DEFAULT_METRICS_PORT;

/// Render the full configuration file for one merged node agent.
pub fn render_agent_config(agent: &NodeAgent) -> String {
    let mut sections = Vec::new();
    sections.push(service_section(agent));
    sections.push(tail_input_section(agent));
    if let Some(filter) = cloud_metadata_section(agent) {
        sections.push(filter);
    }
    sections.push(forward_output_section(agent));
    sections.join("\n")
}

/// Checksum of a rendered configuration, stamped on the daemon's pods.
pub fn config_checksum(config: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.as_bytes());
    hex::encode(hasher.finalize())
}

struct Section {
    name: &'static str,
    entries: Vec<(&'static str, String)>,
}

impl Section {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: &'static str, value: impl Into<String>) {
        self.entries.push((key, value.into()));
    }

    fn entry_opt(&mut self, key: &'static str, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.entry(key, value);
        }
    }

    fn render(&self) -> String {
        let mut out = format!("[{}]\n", self.name);
        for (key, value) in &self.entries {
            out.push_str(&format!("    {:<24}{}\n", key, value));
        }
        out
    }
}

fn service_section(agent: &NodeAgent) -> String {
    let mut section = Section::new("SERVICE");
    section.entry_opt("Flush", agent.flush_interval_secs.map(|v| v.to_string()));
    section.entry_opt("Grace", agent.grace_period_secs.map(|v| v.to_string()));
    section.entry("Daemon", "Off");
    section.entry_opt("Log_Level", agent.log_level.clone());
    section.entry_opt(
        "Coro_Stack_Size",
        agent.coroutine_stack_size.map(|v| v.to_string()),
    );
    section.entry_opt("storage.path", agent.storage.path.clone());
    section.entry_opt("storage.sync", agent.storage.sync.clone());
    section.entry_opt("storage.checksum", agent.storage.checksum.clone());
    section.entry_opt(
        "storage.backlog.mem_limit",
        agent.storage.backlog_mem_limit.clone(),
    );
    section.entry("HTTP_Server", "On");
    section.entry("HTTP_Listen", "0.0.0.0");
    section.entry(
        "HTTP_Port",
        metrics_port(agent).to_string(),
    );
    section.render()
}

fn tail_input_section(agent: &NodeAgent) -> String {
    let mut section = Section::new("INPUT");
    section.entry("Name", "tail");
    section.entry_opt("Path", agent.tail.path.clone());
    section.entry_opt("Refresh_Interval", agent.tail.refresh_interval.clone());
    section.entry_opt("Skip_Long_Lines", agent.tail.skip_long_lines.clone());
    section.entry_opt("DB", agent.tail.db.clone());
    section.entry_opt("Mem_Buf_Limit", agent.tail.mem_buf_limit.clone());
    section.entry_opt("Tag", agent.tail.tag.clone());
    section.render()
}

fn cloud_metadata_section(agent: &NodeAgent) -> Option<String> {
    let filter = agent.cloud_metadata.as_ref()?;
    let mut section = Section::new("FILTER");
    section.entry("Name", "aws");
    section.entry_opt("Match", filter.match_pattern.clone());
    section.entry_opt("imds_version", filter.imds_version.clone());
    section.entry_opt("az", filter.availability_zone.map(bool_value));
    section.entry_opt("ec2_instance_id", filter.instance_id.map(bool_value));
    section.entry_opt("ec2_instance_type", filter.instance_type.map(bool_value));
    section.entry_opt("private_ip", filter.private_ip.map(bool_value));
    section.entry_opt("ami_id", filter.ami_id.map(bool_value));
    section.entry_opt("account_id", filter.account_id.map(bool_value));
    section.entry_opt("hostname", filter.hostname.map(bool_value));
    section.entry_opt("vpc_id", filter.vpc_id.map(bool_value));
    Some(section.render())
}

fn forward_output_section(agent: &NodeAgent) -> String {
    let mut section = Section::new("OUTPUT");
    section.entry("Name", "forward");
    section.entry("Match", "*");
    if let Some(forward) = agent.forward.as_ref() {
        section.entry_opt("Retry_Limit", forward.retry_limit.clone());
        section.entry_opt(
            "Require_ack_response",
            forward.require_ack_response.map(bool_value),
        );
        section.entry_opt(
            "Send_timeout",
            forward.send_timeout_secs.map(|v| v.to_string()),
        );
    }
    section.render()
}

/// Port of the agent's built-in HTTP server, also the metrics port.
pub(crate) fn metrics_port(agent: &NodeAgent) -> u16 {
    agent
        .metrics
        .as_ref()
        .and_then(|m| m.port)
        .unwrap_or(DEFAULT_METRICS_PORT)
}

fn bool_value(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}
