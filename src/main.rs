use clap::Parser;
use kubez_nginx::core::{template, ConfigProvider};
use kubez_nginx::utils::error::{ErrorSeverity, KubezError};
use kubez_nginx::utils::{logger, validation::Validate};
use kubez_nginx::{
    CliConfig, DeployEngine, DeployReport, DockerRuntime, KubeClient, LocalStorage,
    SidecarDeployment, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting kubez-nginx");
    tracing::debug!("CLI config: {:?}", args);

    let outcome = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match TomlConfig::from_file(path) {
                Ok(config) => execute(&config, &args).await,
                Err(e) => Err(e),
            }
        }
        None => execute(&args, &args).await,
    };

    match outcome {
        Ok(Some(report)) => {
            if args.json {
                let mut result = serde_json::to_value(&report)?;
                result["msg"] = serde_json::Value::String(report.message());
                result["failed"] = serde_json::Value::Bool(false);
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&report);
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                "❌ kubez-nginx failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            if args.json {
                let result = serde_json::json!({
                    "changed": false,
                    "failed": true,
                    "msg": e.user_friendly_message(),
                });
                println!("{}", result);
            } else {
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            }

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            std::process::exit(exit_code);
        }
    }

    Ok(())
}

/// Validates the configuration and runs the deployment. `None` means dry run.
async fn execute<C: ConfigProvider + Validate>(
    config: &C,
    args: &CliConfig,
) -> Result<Option<DeployReport>, KubezError> {
    config.validate()?;
    tracing::info!("✅ Configuration validated");

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing is written, patched or started");
        println!("{}", template::render_nginx_conf(&config.nginx())?);
        return Ok(None);
    }

    let storage = LocalStorage::new(config.nginx().kubez_path);
    let services = KubeClient::from_kubeconfig(config.kubeconfig_path())?;
    tracing::debug!("Using API server {}", services.server());
    let runtime = DockerRuntime::connect().await?;

    let deployment = SidecarDeployment::new(storage, services, runtime, config);
    let engine = DeployEngine::new(deployment);

    engine.run().await.map(Some)
}

fn print_summary(report: &DeployReport) {
    println!("✅ {}", report.message());
    println!("📝 Config: {}", report.config_path);
    if let Some(err) = &report.patch_error {
        println!("⚠️ Service patch failed: {}", err);
    }
    let service = &report.service;
    println!(
        "🔍 Service {}/{}: type={} externalIPs={}",
        service.namespace,
        service.name,
        service.service_type,
        service.external_ips.join(",")
    );
    for port in &service.ports {
        println!(
            "   - {} {}/{} -> nodePort {}",
            port.name.as_deref().unwrap_or("-"),
            port.port,
            port.protocol,
            port.node_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
}
