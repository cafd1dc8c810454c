use crate::adapters::kubeconfig::{ClusterConnection, Credentials, Kubeconfig};
use crate::domain::model::{ServicePatch, ServicePortSummary, ServiceSummary};
use crate::domain::ports::ServiceApi;
use crate::utils::error::{KubezError, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const MERGE_PATCH: &str = "application/merge-patch+json";

/// CoreV1 Service client talking straight to the API server.
#[derive(Debug, Clone)]
pub struct KubeClient {
    client: Client,
    server: String,
    credentials: Credentials,
}

impl KubeClient {
    /// Load the kubeconfig at `path` and build a client for its current context.
    pub fn from_kubeconfig<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading kubeconfig from {}", path.display());
        let kubeconfig = Kubeconfig::from_file(path)?;
        let connection = kubeconfig.resolve(path.parent())?;
        Self::from_connection(connection)
    }

    pub fn from_connection(connection: ClusterConnection) -> Result<Self> {
        crate::utils::validation::validate_url("cluster.server", &connection.server)?;

        let mut builder = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10));

        if let Some(ca) = &connection.ca_pem {
            let cert = reqwest::Certificate::from_pem(ca).map_err(|e| {
                KubezError::KubeconfigError {
                    message: format!("invalid certificate authority: {}", e),
                }
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if connection.insecure_skip_tls_verify {
            tracing::warn!("⚠️ TLS verification disabled for {}", connection.server);
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Credentials::ClientCertificate { cert_pem, key_pem } = &connection.credentials {
            let mut pem = cert_pem.clone();
            pem.push(b'\n');
            pem.extend_from_slice(key_pem);
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                KubezError::KubeconfigError {
                    message: format!("invalid client certificate or key: {}", e),
                }
            })?;
            builder = builder.identity(identity);
        }

        Ok(Self {
            client: builder.build()?,
            server: connection.server,
            credentials: connection.credentials,
        })
    }

    /// Plain client without TLS settings, for API servers reachable over http.
    pub fn with_server(server: &str, credentials: Credentials) -> Result<Self> {
        crate::utils::validation::validate_url("cluster.server", server)?;
        Ok(Self {
            client: Client::new(),
            server: server.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn service_url(&self, name: &str, namespace: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{}/services/{}",
            self.server, namespace, name
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::ClientCertificate { .. } | Credentials::None => request,
        }
    }

    async fn decode_service(response: Response) -> Result<ServiceSummary> {
        let status = response.status();
        tracing::debug!("Kubernetes API response status: {}", status);

        if status.is_success() {
            let service: Service = response.json().await?;
            return Ok(service.into());
        }

        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<Status>(&body) {
            Ok(s) => KubezError::KubeApiError {
                status: s.code.unwrap_or(status.as_u16()),
                reason: s.reason.unwrap_or_else(|| status.to_string()),
                message: s.message.unwrap_or_default(),
            },
            Err(_) => KubezError::KubeApiError {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("Unknown")
                    .to_string(),
                message: body,
            },
        })
    }
}

#[async_trait::async_trait]
impl ServiceApi for KubeClient {
    async fn get_namespaced_service(&self, name: &str, namespace: &str) -> Result<ServiceSummary> {
        let url = self.service_url(name, namespace);
        tracing::debug!("GET {}", url);

        let response = self
            .authorize(self.client.get(&url))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        Self::decode_service(response).await
    }

    async fn patch_namespaced_service(
        &self,
        name: &str,
        namespace: &str,
        patch: &ServicePatch,
    ) -> Result<ServiceSummary> {
        let url = self.service_url(name, namespace);
        let body = serde_json::to_vec(patch)?;
        tracing::debug!("PATCH {} ({} bytes)", url, body.len());

        let response = self
            .authorize(self.client.patch(&url))
            .header(reqwest::header::CONTENT_TYPE, MERGE_PATCH)
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        Self::decode_service(response).await
    }
}

// ── Wire types (subset of core/v1 Service and meta/v1 Status) ──────────

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: ServiceSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
    creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceSpec {
    #[serde(rename = "type")]
    service_type: Option<String>,
    #[serde(rename = "clusterIP")]
    cluster_ip: Option<String>,
    #[serde(rename = "externalIPs", default)]
    external_ips: Vec<String>,
    external_name: Option<String>,
    #[serde(default)]
    ports: Vec<ServicePort>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicePort {
    name: Option<String>,
    protocol: Option<String>,
    port: u16,
    target_port: Option<serde_json::Value>,
    node_port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct Status {
    code: Option<u16>,
    reason: Option<String>,
    message: Option<String>,
}

impl From<Service> for ServiceSummary {
    fn from(service: Service) -> Self {
        let ports = service
            .spec
            .ports
            .into_iter()
            .map(|p| ServicePortSummary {
                name: p.name,
                protocol: p.protocol.unwrap_or_else(|| "TCP".to_string()),
                port: p.port,
                target_port: p.target_port.map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                }),
                node_port: p.node_port,
            })
            .collect();

        ServiceSummary {
            name: service.metadata.name,
            namespace: service.metadata.namespace,
            service_type: service
                .spec
                .service_type
                .unwrap_or_else(|| "ClusterIP".to_string()),
            cluster_ip: service.spec.cluster_ip,
            external_ips: service.spec.external_ips,
            external_name: service.spec.external_name,
            ports,
            created_at: service.metadata.creation_timestamp,
        }
    }
}
