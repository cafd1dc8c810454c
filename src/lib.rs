pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{docker::DockerRuntime, kube::KubeClient, storage::LocalStorage};
pub use config::{toml_config::TomlConfig, CliConfig};
pub use core::{deployment::SidecarDeployment, engine::DeployEngine};
pub use domain::model::DeployReport;
pub use utils::error::{KubezError, Result};
