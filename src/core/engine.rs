use crate::core::Deployment;
use crate::domain::model::DeployReport;
use crate::utils::error::Result;

pub struct DeployEngine<D: Deployment> {
    deployment: D,
}

impl<D: Deployment> DeployEngine<D> {
    pub fn new(deployment: D) -> Self {
        Self { deployment }
    }

    /// Runs the steps in order. Only the Service patch is allowed to fail;
    /// any other error ends the run.
    pub async fn run(&self) -> Result<DeployReport> {
        tracing::info!("🚀 Starting kubez-nginx deployment");

        // 1. 產生 nginx 設定檔
        let config_path = self.deployment.render_config().await?;
        tracing::info!("📝 nginx config written to {}", config_path);

        // 2. 更新 Service (失敗只記錄，不中斷)
        let (service_patched, patch_error) = match self.deployment.update_service().await {
            Ok(service) => {
                tracing::info!(
                    "✅ Service {}/{} is now {} with external IPs {:?}",
                    service.namespace,
                    service.name,
                    service.service_type,
                    service.external_ips
                );
                (true, None)
            }
            Err(e) => {
                tracing::error!("❌ Service update failed, continuing: {}", e);
                (false, Some(e.to_string()))
            }
        };

        // 3. 讀回 Service
        let service = self.deployment.describe_service().await?;
        tracing::info!(
            "🔍 Service {}/{}: type={}, clusterIP={}, externalIPs={:?}",
            service.namespace,
            service.name,
            service.service_type,
            service.cluster_ip.as_deref().unwrap_or("-"),
            service.external_ips
        );

        // 4. 建立並重啟容器
        let container_id = self.deployment.restart_container().await?;
        tracing::info!("🐳 Container running ({})", container_id);

        Ok(DeployReport {
            changed: true,
            config_path,
            service_patched,
            patch_error,
            service,
            container_id,
        })
    }
}
