use crate::domain::model::{
    ContainerSpec, NginxSettings, ServicePatch, ServiceSummary, ServiceTarget,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn ensure_dir(&self) -> impl std::future::Future<Output = Result<()>> + Send;
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn kubeconfig_path(&self) -> &str;
    fn service(&self) -> ServiceTarget;
    fn nginx(&self) -> NginxSettings;
    fn container(&self) -> ContainerSpec;
}

#[async_trait]
pub trait ServiceApi: Send + Sync {
    async fn get_namespaced_service(&self, name: &str, namespace: &str)
        -> Result<ServiceSummary>;
    async fn patch_namespaced_service(
        &self,
        name: &str,
        namespace: &str,
        patch: &ServicePatch,
    ) -> Result<ServiceSummary>;
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns the container id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;
    async fn restart_container(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait Deployment: Send + Sync {
    async fn render_config(&self) -> Result<String>;
    async fn update_service(&self) -> Result<ServiceSummary>;
    async fn describe_service(&self) -> Result<ServiceSummary>;
    async fn restart_container(&self) -> Result<String>;
}
