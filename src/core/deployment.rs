use crate::core::template;
use crate::core::{ConfigProvider, ContainerRuntime, Deployment, ServiceApi, ServiceSummary, Storage};
use crate::domain::model::{ContainerSpec, NginxSettings, ServicePatch, ServiceTarget};
use crate::utils::error::Result;

/// Deploys kubez-nginx: renders the config, exposes the ingress Service and
/// (re)starts the sidecar container.
pub struct SidecarDeployment<S: Storage, K: ServiceApi, D: ContainerRuntime> {
    storage: S,
    services: K,
    runtime: D,
    service: ServiceTarget,
    nginx: NginxSettings,
    container: ContainerSpec,
}

impl<S: Storage, K: ServiceApi, D: ContainerRuntime> SidecarDeployment<S, K, D> {
    pub fn new<C: ConfigProvider>(storage: S, services: K, runtime: D, config: &C) -> Self {
        Self {
            storage,
            services,
            runtime,
            service: config.service(),
            nginx: config.nginx(),
            container: config.container(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, K: ServiceApi, D: ContainerRuntime> Deployment for SidecarDeployment<S, K, D> {
    async fn render_config(&self) -> Result<String> {
        tracing::debug!(
            "Rendering nginx config: listen {}:{}, {} endpoint(s) on node port {}",
            self.nginx.lb_vip,
            self.nginx.lb_port,
            self.nginx.endpoints.len(),
            self.nginx.node_port
        );
        template::write_nginx_conf(&self.storage, &self.nginx).await
    }

    async fn update_service(&self) -> Result<ServiceSummary> {
        let patch =
            ServicePatch::load_balancer(&self.service.external_name, &self.service.external_ips);
        tracing::debug!(
            "Patching service {}/{} with external IPs {:?}",
            self.service.namespace,
            self.service.name,
            self.service.external_ips
        );
        self.services
            .patch_namespaced_service(&self.service.name, &self.service.namespace, &patch)
            .await
    }

    async fn describe_service(&self) -> Result<ServiceSummary> {
        self.services
            .get_namespaced_service(&self.service.name, &self.service.namespace)
            .await
    }

    async fn restart_container(&self) -> Result<String> {
        let id = self.runtime.create_container(&self.container).await?;
        self.runtime.restart_container(&self.container.name).await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{RestartPolicy, ServicePortSummary};
    use crate::utils::error::KubezError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn ensure_dir(&self) -> Result<()> {
            Ok(())
        }

        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                KubezError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(format!("mem://{}", path))
        }
    }

    #[derive(Clone, Default)]
    struct MockServices {
        patches: Arc<Mutex<Vec<(String, String, ServicePatch)>>>,
    }

    fn summary(name: &str, namespace: &str, ips: Vec<String>) -> ServiceSummary {
        ServiceSummary {
            name: name.to_string(),
            namespace: namespace.to_string(),
            service_type: "LoadBalancer".to_string(),
            cluster_ip: Some("10.96.0.20".to_string()),
            external_ips: ips,
            external_name: Some("kubez".to_string()),
            ports: vec![ServicePortSummary {
                name: Some("http".to_string()),
                protocol: "TCP".to_string(),
                port: 80,
                target_port: Some("80".to_string()),
                node_port: Some(30080),
            }],
            created_at: None,
        }
    }

    #[async_trait::async_trait]
    impl ServiceApi for MockServices {
        async fn get_namespaced_service(
            &self,
            name: &str,
            namespace: &str,
        ) -> Result<ServiceSummary> {
            Ok(summary(name, namespace, vec![]))
        }

        async fn patch_namespaced_service(
            &self,
            name: &str,
            namespace: &str,
            patch: &ServicePatch,
        ) -> Result<ServiceSummary> {
            self.patches
                .lock()
                .await
                .push((name.to_string(), namespace.to_string(), patch.clone()));
            Ok(summary(name, namespace, patch.spec.external_ips.clone()))
        }
    }

    #[derive(Clone, Default)]
    struct MockRuntime {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl ContainerRuntime for MockRuntime {
        async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
            self.calls
                .lock()
                .await
                .push(format!("create {} {} {}", spec.name, spec.image, spec.bind()));
            Ok("c0ffee".to_string())
        }

        async fn restart_container(&self, name: &str) -> Result<()> {
            self.calls.lock().await.push(format!("restart {}", name));
            Ok(())
        }
    }

    struct MockConfig;

    impl ConfigProvider for MockConfig {
        fn kubeconfig_path(&self) -> &str {
            "/dev/null"
        }

        fn service(&self) -> ServiceTarget {
            ServiceTarget::default()
        }

        fn nginx(&self) -> NginxSettings {
            NginxSettings::default()
        }

        fn container(&self) -> ContainerSpec {
            ContainerSpec {
                restart_policy: RestartPolicy::Always,
                ..ContainerSpec::default()
            }
        }
    }

    #[tokio::test]
    async fn test_render_config_writes_conf_file() {
        let storage = MockStorage::default();
        let deployment = SidecarDeployment::new(
            storage.clone(),
            MockServices::default(),
            MockRuntime::default(),
            &MockConfig,
        );

        let path = deployment.render_config().await.unwrap();

        assert_eq!(path, "mem://kubez-nginx.conf");
        let content = String::from_utf8(storage.read_file("kubez-nginx.conf").await.unwrap())
            .unwrap();
        assert!(content.contains("server 103.39.211.122:30080  max_fails=3 fail_timeout=30s;"));
        assert!(content.contains("listen 0.0.0.0:80;"));
    }

    #[tokio::test]
    async fn test_update_service_patches_ingress() {
        let services = MockServices::default();
        let deployment = SidecarDeployment::new(
            MockStorage::default(),
            services.clone(),
            MockRuntime::default(),
            &MockConfig,
        );

        let service = deployment.update_service().await.unwrap();

        let patches = services.patches.lock().await;
        assert_eq!(patches.len(), 1);
        let (name, namespace, patch) = &patches[0];
        assert_eq!(name, "ingress-nginx");
        assert_eq!(namespace, "kube-system");
        assert_eq!(patch.spec.service_type, "LoadBalancer");
        assert_eq!(patch.spec.external_name, "kubez");
        assert_eq!(service.external_ips, vec!["103.39.211.122"]);
    }

    #[tokio::test]
    async fn test_restart_container_creates_then_restarts() {
        let runtime = MockRuntime::default();
        let deployment = SidecarDeployment::new(
            MockStorage::default(),
            MockServices::default(),
            runtime.clone(),
            &MockConfig,
        );

        let id = deployment.restart_container().await.unwrap();

        assert_eq!(id, "c0ffee");
        let calls = runtime.calls.lock().await;
        assert_eq!(
            *calls,
            vec![
                "create kubez-nginx jacky06/kube-nginx:v1.1 /var/lib/kubez-nginx:/etc/kubez-nginx:rw"
                    .to_string(),
                "restart kubez-nginx".to_string(),
            ]
        );
    }
}
