//! Minimal kubeconfig loader: enough of the format to talk to the API server
//! with the credentials kubeadm writes into `admin.conf`.

use crate::utils::error::{KubezError, Result};
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Kubeconfig {
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context", default)]
    pub current_context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cluster {
    pub server: String,
    pub certificate_authority_data: Option<String>,
    pub certificate_authority: Option<String>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: AuthInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthInfo {
    pub client_certificate_data: Option<String>,
    pub client_key_data: Option<String>,
    pub client_certificate: Option<String>,
    pub client_key: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    pub cluster: String,
    pub user: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    ClientCertificate { cert_pem: Vec<u8>, key_pem: Vec<u8> },
    Token(String),
    Basic { username: String, password: String },
    None,
}

/// Connection parameters for the current context.
#[derive(Debug, Clone)]
pub struct ClusterConnection {
    pub server: String,
    pub ca_pem: Option<Vec<u8>>,
    pub insecure_skip_tls_verify: bool,
    pub credentials: Credentials,
    pub namespace: Option<String>,
}

impl Kubeconfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| KubezError::KubeconfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve `current-context` into something a client can connect with.
    /// Relative certificate paths are resolved against `base_dir`.
    pub fn resolve(&self, base_dir: Option<&Path>) -> Result<ClusterConnection> {
        let context_name = self.current_context.as_deref().ok_or_else(|| {
            KubezError::KubeconfigError {
                message: "current-context is not set".to_string(),
            }
        })?;

        let context = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| KubezError::KubeconfigError {
                message: format!("context '{}' not found", context_name),
            })?;

        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| KubezError::KubeconfigError {
                message: format!("cluster '{}' not found", context.cluster),
            })?;

        let user = self
            .users
            .iter()
            .find(|u| u.name == context.user)
            .map(|u| &u.user)
            .ok_or_else(|| KubezError::KubeconfigError {
                message: format!("user '{}' not found", context.user),
            })?;

        let ca_pem = load_pem(
            "certificate-authority",
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            base_dir,
        )?;

        Ok(ClusterConnection {
            server: cluster.server.trim_end_matches('/').to_string(),
            ca_pem,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
            credentials: resolve_credentials(user, base_dir)?,
            namespace: context.namespace.clone(),
        })
    }
}

fn resolve_credentials(user: &AuthInfo, base_dir: Option<&Path>) -> Result<Credentials> {
    let cert = load_pem(
        "client-certificate",
        user.client_certificate_data.as_deref(),
        user.client_certificate.as_deref(),
        base_dir,
    )?;
    let key = load_pem(
        "client-key",
        user.client_key_data.as_deref(),
        user.client_key.as_deref(),
        base_dir,
    )?;

    match (cert, key) {
        (Some(cert_pem), Some(key_pem)) => {
            return Ok(Credentials::ClientCertificate { cert_pem, key_pem })
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(KubezError::KubeconfigError {
                message: "client certificate and client key must be set together".to_string(),
            })
        }
        (None, None) => {}
    }

    if let Some(token) = &user.token {
        return Ok(Credentials::Token(token.clone()));
    }
    if let Some(token_file) = &user.token_file {
        let token = std::fs::read_to_string(resolve_path(token_file, base_dir))?;
        return Ok(Credentials::Token(token.trim().to_string()));
    }
    if let (Some(username), Some(password)) = (&user.username, &user.password) {
        return Ok(Credentials::Basic {
            username: username.clone(),
            password: password.clone(),
        });
    }

    Ok(Credentials::None)
}

fn load_pem(
    field: &str,
    inline_b64: Option<&str>,
    file: Option<&str>,
    base_dir: Option<&Path>,
) -> Result<Option<Vec<u8>>> {
    if let Some(data) = inline_b64 {
        let cleaned: String = data.split_whitespace().collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| KubezError::KubeconfigError {
                message: format!("{}-data is not valid base64: {}", field, e),
            })?;
        return Ok(Some(decoded));
    }

    match file {
        Some(path) => {
            let full_path = resolve_path(path, base_dir);
            let bytes = std::fs::read(&full_path).map_err(|e| KubezError::KubeconfigError {
                message: format!("cannot read {} {}: {}", field, full_path.display(), e),
            })?;
            Ok(Some(bytes))
        }
        None => Ok(None),
    }
}

fn resolve_path(path: &str, base_dir: Option<&Path>) -> PathBuf {
    let p = Path::new(path);
    match base_dir {
        Some(dir) if p.is_relative() => dir.join(p),
        _ => p.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn b64(s: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(s)
    }

    fn admin_conf() -> String {
        format!(
            r#"
apiVersion: v1
kind: Config
clusters:
- cluster:
    certificate-authority-data: {ca}
    server: https://10.0.0.1:6443/
  name: kubernetes
contexts:
- context:
    cluster: kubernetes
    user: kubernetes-admin
  name: kubernetes-admin@kubernetes
current-context: kubernetes-admin@kubernetes
preferences: {{}}
users:
- name: kubernetes-admin
  user:
    client-certificate-data: {cert}
    client-key-data: {key}
"#,
            ca = b64("CA PEM"),
            cert = b64("CERT PEM"),
            key = b64("KEY PEM"),
        )
    }

    #[test]
    fn test_resolve_kubeadm_admin_conf() {
        let config = Kubeconfig::from_yaml_str(&admin_conf()).unwrap();
        let conn = config.resolve(None).unwrap();

        assert_eq!(conn.server, "https://10.0.0.1:6443");
        assert_eq!(conn.ca_pem.as_deref(), Some("CA PEM".as_bytes()));
        assert!(!conn.insecure_skip_tls_verify);
        assert_eq!(
            conn.credentials,
            Credentials::ClientCertificate {
                cert_pem: b"CERT PEM".to_vec(),
                key_pem: b"KEY PEM".to_vec(),
            }
        );
    }

    #[test]
    fn test_resolve_token_user() {
        let yaml = r#"
clusters:
- name: local
  cluster:
    server: http://127.0.0.1:8080
    insecure-skip-tls-verify: true
contexts:
- name: dev
  context:
    cluster: local
    user: bot
    namespace: kube-system
current-context: dev
users:
- name: bot
  user:
    token: abc123
"#;
        let conn = Kubeconfig::from_yaml_str(yaml).unwrap().resolve(None).unwrap();

        assert!(conn.insecure_skip_tls_verify);
        assert_eq!(conn.credentials, Credentials::Token("abc123".to_string()));
        assert_eq!(conn.namespace.as_deref(), Some("kube-system"));
        assert!(conn.ca_pem.is_none());
    }

    #[test]
    fn test_missing_current_context() {
        let yaml = "clusters: []\nusers: []\ncontexts: []\n";
        let err = Kubeconfig::from_yaml_str(yaml)
            .unwrap()
            .resolve(None)
            .unwrap_err();
        assert!(matches!(err, KubezError::KubeconfigError { .. }));
    }

    #[test]
    fn test_unknown_cluster_reference() {
        let yaml = r#"
clusters: []
contexts:
- name: dev
  context:
    cluster: gone
    user: bot
current-context: dev
users:
- name: bot
  user: {}
"#;
        let err = Kubeconfig::from_yaml_str(yaml)
            .unwrap()
            .resolve(None)
            .unwrap_err();
        assert!(err.to_string().contains("cluster 'gone' not found"));
    }

    #[test]
    fn test_relative_certificate_files_resolve_against_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut ca = std::fs::File::create(temp_dir.path().join("ca.crt")).unwrap();
        ca.write_all(b"FILE CA").unwrap();

        let yaml = r#"
clusters:
- name: c
  cluster:
    server: https://k8s.local:6443
    certificate-authority: ca.crt
contexts:
- name: x
  context:
    cluster: c
    user: u
current-context: x
users:
- name: u
  user:
    username: admin
    password: secret
"#;
        let conn = Kubeconfig::from_yaml_str(yaml)
            .unwrap()
            .resolve(Some(temp_dir.path()))
            .unwrap();

        assert_eq!(conn.ca_pem.as_deref(), Some("FILE CA".as_bytes()));
        assert_eq!(
            conn.credentials,
            Credentials::Basic {
                username: "admin".to_string(),
                password: "secret".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_base64_is_reported() {
        let yaml = r#"
clusters:
- name: c
  cluster:
    server: https://k8s.local:6443
    certificate-authority-data: "!!!not-base64"
contexts:
- name: x
  context: {cluster: c, user: u}
current-context: x
users:
- name: u
"#;
        let err = Kubeconfig::from_yaml_str(yaml)
            .unwrap()
            .resolve(None)
            .unwrap_err();
        assert!(err.to_string().contains("certificate-authority-data"));
    }
}
