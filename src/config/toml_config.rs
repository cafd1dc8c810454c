use crate::core::ConfigProvider;
use crate::domain::model::{
    ContainerSpec, NginxSettings, RestartPolicy, ServiceTarget, DEFAULT_KUBECONFIG,
};
use crate::utils::error::{KubezError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub nginx: NginxConfig,
    #[serde(default)]
    pub container: ContainerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubernetesConfig {
    pub kubeconfig: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub external_ips: Option<Vec<String>>,
    pub external_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NginxConfig {
    pub kubez_path: Option<String>,
    pub endpoints: Option<Vec<String>>,
    pub lb_vip: Option<String>,
    pub lb_port: Option<u16>,
    pub node_port: Option<u16>,
    pub worker_connections: Option<u32>,
    pub max_fails: Option<u32>,
    pub fail_timeout: Option<String>,
    pub proxy_connect_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub name: Option<String>,
    pub image: Option<String>,
    pub mount_target: Option<String>,
    pub read_only: Option<bool>,
    pub network_mode: Option<String>,
    pub restart_policy: Option<String>,
    pub pull_image: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(KubezError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| KubezError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${KUBEZ_VIP})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| KubezError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn restart_policy(&self) -> Result<RestartPolicy> {
        match self.container.restart_policy.as_deref() {
            None => Ok(RestartPolicy::Always),
            Some(value) => {
                RestartPolicy::parse(value).ok_or_else(|| KubezError::InvalidConfigValueError {
                    field: "container.restart_policy".to_string(),
                    value: value.to_string(),
                    reason: "Valid policies: no, always, unless-stopped, on-failure".to_string(),
                })
            }
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("kubernetes.kubeconfig", self.kubeconfig_path())?;
        self.restart_policy()?;
        if let Some(mode) = &self.container.network_mode {
            validation::validate_non_empty_string("container.network_mode", mode)?;
        }
        super::validate_deployment(&self.service(), &self.nginx(), &self.container())
    }
}

impl ConfigProvider for TomlConfig {
    fn kubeconfig_path(&self) -> &str {
        self.kubernetes
            .kubeconfig
            .as_deref()
            .unwrap_or(DEFAULT_KUBECONFIG)
    }

    fn service(&self) -> ServiceTarget {
        let defaults = ServiceTarget::default();
        let s = &self.service;
        ServiceTarget {
            name: s.name.clone().unwrap_or(defaults.name),
            namespace: s.namespace.clone().unwrap_or(defaults.namespace),
            external_ips: s.external_ips.clone().unwrap_or(defaults.external_ips),
            external_name: s.external_name.clone().unwrap_or(defaults.external_name),
        }
    }

    fn nginx(&self) -> NginxSettings {
        let defaults = NginxSettings::default();
        let n = &self.nginx;
        NginxSettings {
            kubez_path: n.kubez_path.clone().unwrap_or(defaults.kubez_path),
            endpoints: n.endpoints.clone().unwrap_or(defaults.endpoints),
            lb_vip: n.lb_vip.clone().unwrap_or(defaults.lb_vip),
            lb_port: n.lb_port.unwrap_or(defaults.lb_port),
            node_port: n.node_port.unwrap_or(defaults.node_port),
            worker_connections: n.worker_connections.unwrap_or(defaults.worker_connections),
            max_fails: n.max_fails.unwrap_or(defaults.max_fails),
            fail_timeout: n.fail_timeout.clone().unwrap_or(defaults.fail_timeout),
            proxy_connect_timeout: n
                .proxy_connect_timeout
                .clone()
                .unwrap_or(defaults.proxy_connect_timeout),
        }
    }

    fn container(&self) -> ContainerSpec {
        let defaults = ContainerSpec::default();
        let c = &self.container;
        ContainerSpec {
            name: c.name.clone().unwrap_or(defaults.name),
            image: c.image.clone().unwrap_or(defaults.image),
            bind_source: self.nginx().kubez_path,
            bind_target: c.mount_target.clone().unwrap_or(defaults.bind_target),
            read_only: c.read_only.unwrap_or(defaults.read_only),
            network_mode: c.network_mode.clone().unwrap_or(defaults.network_mode),
            restart_policy: self.restart_policy().unwrap_or(defaults.restart_policy),
            pull_image: c.pull_image.unwrap_or(defaults.pull_image),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[kubernetes]
kubeconfig = "/root/.kube/config"

[service]
name = "ingress-nginx"
namespace = "ingress"
external_ips = ["10.10.0.5", "10.10.0.6"]

[nginx]
kubez_path = "/srv/kubez"
endpoints = ["10.10.0.5", "10.10.0.6"]
lb_vip = "10.10.0.100"
lb_port = 443
node_port = 30443
worker_connections = 2048

[container]
image = "nginx:1.25-alpine"
restart_policy = "unless-stopped"
pull_image = false
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.kubeconfig_path(), "/root/.kube/config");
        assert_eq!(config.service().namespace, "ingress");
        assert_eq!(config.service().external_name, "kubez");
        assert_eq!(config.nginx().worker_connections, 2048);
        assert_eq!(config.nginx().max_fails, 3);

        let container = config.container();
        assert_eq!(container.name, "kubez-nginx");
        assert_eq!(container.bind(), "/srv/kubez:/etc/kubez-nginx:rw");
        assert_eq!(container.restart_policy, RestartPolicy::UnlessStopped);
        assert!(!container.pull_image);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.kubeconfig_path(), "/etc/kubernetes/admin.conf");
        assert_eq!(config.service(), ServiceTarget::default());
        assert_eq!(config.nginx(), NginxSettings::default());
        assert_eq!(config.container(), ContainerSpec::default());
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let config =
            TomlConfig::from_toml_str(include_str!("../../kubez-nginx.example.toml")).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.service(), ServiceTarget::default());
        assert_eq!(config.nginx(), NginxSettings::default());
        assert_eq!(config.container(), ContainerSpec::default());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("KUBEZ_TEST_VIP", "172.16.0.9");

        let toml_content = r#"
[nginx]
lb_vip = "${KUBEZ_TEST_VIP}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.nginx().lb_vip, "172.16.0.9");

        std::env::remove_var("KUBEZ_TEST_VIP");
    }

    #[test]
    fn test_unset_env_var_is_left_in_place() {
        let toml_content = r#"
[nginx]
lb_vip = "${KUBEZ_TEST_SURELY_UNSET}"
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.nginx().lb_vip, "${KUBEZ_TEST_SURELY_UNSET}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[nginx]
lb_port = 0
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let bad_policy = TomlConfig::from_toml_str("[container]\nrestart_policy = \"never\"\n").unwrap();
        assert!(bad_policy.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlConfig::from_toml_str("[nginx\nlb_port = 1").unwrap_err();
        assert!(matches!(err, KubezError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[service]
name = "file-test"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.service().name, "file-test");
    }
}
