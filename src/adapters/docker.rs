// Docker container lifecycle for the kubez-nginx sidecar.

use crate::domain::model::{ContainerSpec, RestartPolicy};
use crate::domain::ports::ContainerRuntime;
use crate::utils::error::{KubezError, Result};
use bollard::container::{Config as ContainerConfig, CreateContainerOptions, RestartContainerOptions};
use bollard::errors::Error as BollardError;
use bollard::models::{HostConfig, RestartPolicyNameEnum};
use bollard::Docker;

/// Seconds Docker waits for nginx to stop before killing it on restart.
const RESTART_TIMEOUT_SECS: isize = 10;

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the local daemon (unix socket or `DOCKER_HOST`), API version negotiated.
    pub async fn connect() -> Result<Self> {
        let docker = get_docker_client()?;
        let docker = docker.negotiate_version().await?;
        tracing::debug!("Connected to Docker daemon (API {:?})", docker.client_version());
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    /// Pull Docker image if not already present locally.
    async fn pull_image_if_needed(&self, image: &str) -> Result<()> {
        use bollard::image::CreateImageOptions;
        use futures::StreamExt;

        if self.docker.inspect_image(image).await.is_ok() {
            tracing::debug!("Image {} already present", image);
            return Ok(());
        }

        tracing::info!("⬇️ Pulling image {}", image);
        let opts = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            let info = result?;
            if let Some(status) = info.status {
                tracing::debug!("pull {}: {}", image, status);
            }
        }

        Ok(())
    }

    async fn existing_container_id(&self, name: &str) -> Result<String> {
        let info = self.docker.inspect_container(name, None).await?;
        info.id.ok_or_else(|| KubezError::ContainerError {
            name: name.to_string(),
            message: "inspect returned no container id".to_string(),
        })
    }
}

pub fn get_docker_client() -> Result<Docker> {
    Ok(Docker::connect_with_local_defaults()?)
}

/// Builds the create request: host networking, config directory bind mount, restart policy.
pub fn container_config(spec: &ContainerSpec) -> ContainerConfig<String> {
    let host_config = HostConfig {
        binds: Some(vec![spec.bind()]),
        network_mode: Some(spec.network_mode.clone()),
        restart_policy: Some(bollard::models::RestartPolicy {
            name: Some(restart_policy_name(spec.restart_policy)),
            maximum_retry_count: None,
        }),
        ..Default::default()
    };

    ContainerConfig {
        image: Some(spec.image.clone()),
        host_config: Some(host_config),
        ..Default::default()
    }
}

fn restart_policy_name(policy: RestartPolicy) -> RestartPolicyNameEnum {
    match policy {
        RestartPolicy::No => RestartPolicyNameEnum::NO,
        RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
        RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
        RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
    }
}

fn is_name_conflict(err: &BollardError) -> bool {
    matches!(
        err,
        BollardError::DockerResponseServerError {
            status_code: 409,
            ..
        }
    )
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        if spec.pull_image {
            self.pull_image_if_needed(&spec.image).await?;
        }

        let create_opts = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        match self
            .docker
            .create_container(Some(create_opts), container_config(spec))
            .await
        {
            Ok(created) => {
                for warning in &created.warnings {
                    tracing::warn!("⚠️ Docker: {}", warning);
                }
                tracing::info!("🐳 Created container {} ({})", spec.name, created.id);
                Ok(created.id)
            }
            Err(e) if is_name_conflict(&e) => {
                // 同名容器已存在，沿用既有容器並在後續重啟
                tracing::warn!(
                    "⚠️ Container {} already exists, reusing it: {}",
                    spec.name,
                    e
                );
                self.existing_container_id(&spec.name).await
            }
            Err(e) => Err(KubezError::ContainerError {
                name: spec.name.clone(),
                message: format!("create failed: {}", e),
            }),
        }
    }

    async fn restart_container(&self, name: &str) -> Result<()> {
        tracing::info!("🔄 Restarting container {}", name);
        self.docker
            .restart_container(
                name,
                Some(RestartContainerOptions {
                    t: RESTART_TIMEOUT_SECS,
                }),
            )
            .await
            .map_err(|e| KubezError::ContainerError {
                name: name.to_string(),
                message: format!("restart failed: {}", e),
            })
    }
}
