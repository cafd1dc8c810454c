pub mod deployment;
pub mod engine;
pub mod template;

pub use crate::domain::model::{DeployReport, ServiceSummary};
pub use crate::domain::ports::{ConfigProvider, ContainerRuntime, Deployment, ServiceApi, Storage};
pub use crate::utils::error::Result;
