// Adapters layer: concrete implementations for external systems
// (Kubernetes API server, Docker daemon, local file system).

pub mod docker;
pub mod kube;
pub mod kubeconfig;
pub mod storage;
