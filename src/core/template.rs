use crate::domain::model::{NginxSettings, CONF_FILE_NAME};
use crate::domain::ports::Storage;
use crate::utils::error::{KubezError, Result};

/// 產生 nginx stream 代理設定 (不含結尾換行)
pub fn render_nginx_conf(settings: &NginxSettings) -> Result<String> {
    if settings.endpoints.is_empty() {
        return Err(KubezError::TemplateError {
            message: "no upstream endpoints to render".to_string(),
        });
    }

    let ep_entries: String = settings
        .endpoints
        .iter()
        .map(|endpoint| {
            format!(
                "        server {}:{}  max_fails={} fail_timeout={};\n",
                host_literal(endpoint),
                settings.node_port,
                settings.max_fails,
                settings.fail_timeout
            )
        })
        .collect();

    Ok(format!(
        "#NOTE: Generated by kubez template.
worker_processes 1;
events {{
    worker_connections  {worker_connections};
}}
stream {{
    upstream backend {{
        hash $remote_addr consistent;
        {ep_entries}
    }}
    server {{
        listen {lb_vip}:{lb_port};
        proxy_connect_timeout {connect_timeout};
        proxy_pass backend;
    }}
}}",
        worker_connections = settings.worker_connections,
        ep_entries = ep_entries.trim(),
        lb_vip = host_literal(&settings.lb_vip),
        lb_port = settings.lb_port,
        connect_timeout = settings.proxy_connect_timeout,
    ))
}

// nginx 的 IPv6 位址 (listen 與 upstream server) 需要中括號
fn host_literal(addr: &str) -> String {
    if addr.contains(':') && !addr.starts_with('[') {
        format!("[{}]", addr)
    } else {
        addr.to_string()
    }
}

/// Render the config and write it as `kubez-nginx.conf`, creating the directory if needed.
pub async fn write_nginx_conf<S: Storage>(storage: &S, settings: &NginxSettings) -> Result<String> {
    let content = render_nginx_conf(settings)?;

    storage.ensure_dir().await?;
    tracing::debug!("Writing {} ({} bytes)", CONF_FILE_NAME, content.len());
    storage.write_file(CONF_FILE_NAME, content.as_bytes()).await
}
