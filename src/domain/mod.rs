// Domain layer: core models and ports (interfaces). Adapters for Kubernetes,
// Docker and the local file system live under src/adapters.

pub mod model;
pub mod ports;
