pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::{
    ContainerSpec, NginxSettings, RestartPolicy, ServiceTarget, DEFAULT_MOUNT_TARGET,
};
use crate::utils::error::{KubezError, Result};
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "kubez-nginx"))]
#[cfg_attr(
    feature = "cli",
    command(about = "Expose an ingress Service and run the kubez-nginx load balancer sidecar")
)]
pub struct CliConfig {
    /// TOML configuration file; replaces the deployment flags below
    #[cfg_attr(feature = "cli", arg(short, long))]
    pub config: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, default_value = "/etc/kubernetes/admin.conf"))]
    pub kubeconfig: String,

    /// Service to expose
    #[cfg_attr(feature = "cli", arg(long, default_value = "ingress-nginx"))]
    pub name: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "kube-system"))]
    pub namespace: String,

    #[cfg_attr(
        feature = "cli",
        arg(long, value_delimiter = ',', default_value = "103.39.211.122")
    )]
    pub external_ips: Vec<String>,

    #[cfg_attr(feature = "cli", arg(long, default_value = "kubez"))]
    pub external_name: String,

    /// Directory holding kubez-nginx.conf, bind mounted into the container
    #[cfg_attr(feature = "cli", arg(long, default_value = "/var/lib/kubez-nginx"))]
    pub kubez_path: String,

    /// Upstream servers nginx balances across
    #[cfg_attr(
        feature = "cli",
        arg(long, value_delimiter = ',', default_value = "103.39.211.122")
    )]
    pub endpoints: Vec<String>,

    #[cfg_attr(feature = "cli", arg(long, default_value = "0.0.0.0"))]
    pub lb_vip: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "80"))]
    pub lb_port: u16,

    #[cfg_attr(feature = "cli", arg(long, default_value = "30080"))]
    pub node_port: u16,

    #[cfg_attr(feature = "cli", arg(long, default_value = "kubez-nginx"))]
    pub container_name: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "jacky06/kube-nginx:v1.1"))]
    pub image: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "always"))]
    pub restart_policy: String,

    /// Do not pull the image when it is missing locally
    #[cfg_attr(feature = "cli", arg(long))]
    pub no_pull: bool,

    /// Render the nginx config to stdout and exit
    #[cfg_attr(feature = "cli", arg(long))]
    pub dry_run: bool,

    /// Print the result as a JSON object (Ansible module style)
    #[cfg_attr(feature = "cli", arg(long))]
    pub json: bool,

    /// Emit logs as JSON lines
    #[cfg_attr(feature = "cli", arg(long))]
    pub log_json: bool,

    #[cfg_attr(feature = "cli", arg(short, long, help = "Enable verbose output"))]
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        let service = ServiceTarget::default();
        let nginx = NginxSettings::default();
        let container = ContainerSpec::default();
        Self {
            config: None,
            kubeconfig: crate::domain::model::DEFAULT_KUBECONFIG.to_string(),
            name: service.name,
            namespace: service.namespace,
            external_ips: service.external_ips,
            external_name: service.external_name,
            kubez_path: nginx.kubez_path,
            endpoints: nginx.endpoints,
            lb_vip: nginx.lb_vip,
            lb_port: nginx.lb_port,
            node_port: nginx.node_port,
            container_name: container.name,
            image: container.image,
            restart_policy: "always".to_string(),
            no_pull: false,
            dry_run: false,
            json: false,
            log_json: false,
            verbose: false,
        }
    }
}

impl CliConfig {
    fn parsed_restart_policy(&self) -> RestartPolicy {
        RestartPolicy::parse(&self.restart_policy).unwrap_or(RestartPolicy::Always)
    }
}

impl ConfigProvider for CliConfig {
    fn kubeconfig_path(&self) -> &str {
        &self.kubeconfig
    }

    fn service(&self) -> ServiceTarget {
        ServiceTarget {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            external_ips: self.external_ips.clone(),
            external_name: self.external_name.clone(),
        }
    }

    fn nginx(&self) -> NginxSettings {
        NginxSettings {
            kubez_path: self.kubez_path.clone(),
            endpoints: self.endpoints.clone(),
            lb_vip: self.lb_vip.clone(),
            lb_port: self.lb_port,
            node_port: self.node_port,
            ..NginxSettings::default()
        }
    }

    fn container(&self) -> ContainerSpec {
        ContainerSpec {
            name: self.container_name.clone(),
            image: self.image.clone(),
            bind_source: self.kubez_path.clone(),
            bind_target: DEFAULT_MOUNT_TARGET.to_string(),
            restart_policy: self.parsed_restart_policy(),
            pull_image: !self.no_pull,
            ..ContainerSpec::default()
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if RestartPolicy::parse(&self.restart_policy).is_none() {
            return Err(KubezError::InvalidConfigValueError {
                field: "restart_policy".to_string(),
                value: self.restart_policy.clone(),
                reason: "Valid policies: no, always, unless-stopped, on-failure".to_string(),
            });
        }
        validation::validate_path("kubeconfig", &self.kubeconfig)?;
        validate_deployment(&self.service(), &self.nginx(), &self.container())
    }
}

/// Checks shared by every configuration source.
pub fn validate_deployment(
    service: &ServiceTarget,
    nginx: &NginxSettings,
    container: &ContainerSpec,
) -> Result<()> {
    // 兩者都會直接放進 API 路徑
    validation::validate_dns_label("service.name", &service.name)?;
    validation::validate_dns_label("service.namespace", &service.namespace)?;
    validation::validate_ip_list("service.external_ips", &service.external_ips)?;

    validation::validate_absolute_path("nginx.kubez_path", &nginx.kubez_path)?;
    validation::validate_ip_list("nginx.endpoints", &nginx.endpoints)?;
    validation::validate_ip("nginx.lb_vip", &nginx.lb_vip)?;
    validation::validate_port("nginx.lb_port", nginx.lb_port)?;
    validation::validate_port("nginx.node_port", nginx.node_port)?;
    validation::validate_positive_number(
        "nginx.worker_connections",
        nginx.worker_connections as usize,
        1,
    )?;

    validation::validate_non_empty_string("container.name", &container.name)?;
    validation::validate_non_empty_string("container.image", &container.image)?;
    validation::validate_absolute_path("container.mount_target", &container.bind_target)?;
    Ok(())
}
