use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_KUBECONFIG: &str = "/etc/kubernetes/admin.conf";
pub const DEFAULT_IMAGE: &str = "jacky06/kube-nginx:v1.1";
pub const DEFAULT_KUBEZ_PATH: &str = "/var/lib/kubez-nginx";
pub const DEFAULT_CONTAINER_NAME: &str = "kubez-nginx";
pub const DEFAULT_MOUNT_TARGET: &str = "/etc/kubez-nginx";
pub const DEFAULT_SERVICE_NAME: &str = "ingress-nginx";
pub const DEFAULT_NAMESPACE: &str = "kube-system";
pub const DEFAULT_EXTERNAL_IP: &str = "103.39.211.122";
pub const DEFAULT_EXTERNAL_NAME: &str = "kubez";
pub const CONF_FILE_NAME: &str = "kubez-nginx.conf";

/// The Service to expose and the addresses to put on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub name: String,
    pub namespace: String,
    pub external_ips: Vec<String>,
    pub external_name: String,
}

impl Default for ServiceTarget {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVICE_NAME.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            external_ips: vec![DEFAULT_EXTERNAL_IP.to_string()],
            external_name: DEFAULT_EXTERNAL_NAME.to_string(),
        }
    }
}

/// Merge patch body sent to the Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePatch {
    pub spec: ServicePatchSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePatchSpec {
    #[serde(rename = "externalName")]
    pub external_name: String,
    #[serde(rename = "externalIPs")]
    pub external_ips: Vec<String>,
    #[serde(rename = "type")]
    pub service_type: String,
}

impl ServicePatch {
    pub fn load_balancer(external_name: &str, external_ips: &[String]) -> Self {
        Self {
            spec: ServicePatchSpec {
                external_name: external_name.to_string(),
                external_ips: external_ips.to_vec(),
                service_type: "LoadBalancer".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePortSummary {
    pub name: Option<String>,
    pub protocol: String,
    pub port: u16,
    pub target_port: Option<String>,
    pub node_port: Option<u16>,
}

/// The subset of a Service object reported back after patching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub namespace: String,
    pub service_type: String,
    pub cluster_ip: Option<String>,
    pub external_ips: Vec<String>,
    pub external_name: Option<String>,
    pub ports: Vec<ServicePortSummary>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ServiceSummary {
    /// First node port of the Service, which is what the nginx upstream points at.
    pub fn first_node_port(&self) -> Option<u16> {
        self.ports.iter().find_map(|p| p.node_port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NginxSettings {
    pub kubez_path: String,
    pub endpoints: Vec<String>,
    pub lb_vip: String,
    pub lb_port: u16,
    pub node_port: u16,
    pub worker_connections: u32,
    pub max_fails: u32,
    pub fail_timeout: String,
    pub proxy_connect_timeout: String,
}

impl Default for NginxSettings {
    fn default() -> Self {
        Self {
            kubez_path: DEFAULT_KUBEZ_PATH.to_string(),
            endpoints: vec![DEFAULT_EXTERNAL_IP.to_string()],
            lb_vip: "0.0.0.0".to_string(),
            lb_port: 80,
            node_port: 30080,
            worker_connections: 1024,
            max_fails: 3,
            fail_timeout: "30s".to_string(),
            proxy_connect_timeout: "1s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    No,
    Always,
    UnlessStopped,
    OnFailure,
}

impl RestartPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "no" => Some(Self::No),
            "always" => Some(Self::Always),
            "unless-stopped" => Some(Self::UnlessStopped),
            "on-failure" => Some(Self::OnFailure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub bind_source: String,
    pub bind_target: String,
    pub read_only: bool,
    pub network_mode: String,
    pub restart_policy: RestartPolicy,
    pub pull_image: bool,
}

impl ContainerSpec {
    /// `source:target:mode`, the form the Docker API expects in `HostConfig.Binds`.
    pub fn bind(&self) -> String {
        let mode = if self.read_only { "ro" } else { "rw" };
        format!("{}:{}:{}", self.bind_source, self.bind_target, mode)
    }
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONTAINER_NAME.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            bind_source: DEFAULT_KUBEZ_PATH.to_string(),
            bind_target: DEFAULT_MOUNT_TARGET.to_string(),
            read_only: false,
            network_mode: "host".to_string(),
            restart_policy: RestartPolicy::Always,
            pull_image: true,
        }
    }
}

/// Outcome of one deployment run.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub changed: bool,
    pub config_path: String,
    pub service_patched: bool,
    pub patch_error: Option<String>,
    pub service: ServiceSummary,
    pub container_id: String,
}

impl DeployReport {
    pub fn message(&self) -> String {
        let id = short_id(&self.container_id);
        match &self.patch_error {
            None => format!("kubez-nginx deployed (container {})", id),
            Some(err) => format!(
                "kubez-nginx deployed (container {}), service patch failed: {}",
                id, err
            ),
        }
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
