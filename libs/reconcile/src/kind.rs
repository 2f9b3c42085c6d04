//! Managed resource kinds and their pipeline order.

use std::fmt;

/// The kinds of managed objects a node agent owns.
///
/// Reconciliation walks [`ResourceKind::ORDERED`]; the order is load
/// bearing because later resources reference earlier ones (a binding
/// names its role and service account, the daemon mounts the config
/// secret).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ServiceAccount,
    ClusterRole,
    ClusterRoleBinding,
    PodSecurityPolicy,
    PspClusterRole,
    PspClusterRoleBinding,
    ConfigSecret,
    DaemonSet,
    MetricsService,
    MetricsServiceMonitor,
}

impl ResourceKind {
    /// Every managed kind, in the order the pipeline applies them.
    pub const ORDERED: [ResourceKind; 10] = [
        ResourceKind::ServiceAccount,
        ResourceKind::ClusterRole,
        ResourceKind::ClusterRoleBinding,
        ResourceKind::PodSecurityPolicy,
        ResourceKind::PspClusterRole,
        ResourceKind::PspClusterRoleBinding,
        ResourceKind::ConfigSecret,
        ResourceKind::DaemonSet,
        ResourceKind::MetricsService,
        ResourceKind::MetricsServiceMonitor,
    ];

    /// Fixed name suffix for objects of this kind; the last component of
    /// the qualified name.
    pub fn suffix(self) -> &'static str {
        match self {
            ResourceKind::ServiceAccount => "fluentbit",
            ResourceKind::ClusterRole => "fluentbit",
            ResourceKind::ClusterRoleBinding => "fluentbit",
            ResourceKind::PodSecurityPolicy => "fluentbit",
            ResourceKind::PspClusterRole => "fluentbit-psp",
            ResourceKind::PspClusterRoleBinding => "fluentbit-psp",
            ResourceKind::ConfigSecret => "fluentbit",
            ResourceKind::DaemonSet => "fluentbit",
            ResourceKind::MetricsService => "fluentbit-metrics",
            ResourceKind::MetricsServiceMonitor => "fluentbit-metrics",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::ServiceAccount => "service-account",
            ResourceKind::ClusterRole => "cluster-role",
            ResourceKind::ClusterRoleBinding => "cluster-role-binding",
            ResourceKind::PodSecurityPolicy => "pod-security-policy",
            ResourceKind::PspClusterRole => "psp-cluster-role",
            ResourceKind::PspClusterRoleBinding => "psp-cluster-role-binding",
            ResourceKind::ConfigSecret => "config-secret",
            ResourceKind::DaemonSet => "daemon-set",
            ResourceKind::MetricsService => "metrics-service",
            ResourceKind::MetricsServiceMonitor => "metrics-service-monitor",
        };
        write!(f, "{}", s)
    }
}
