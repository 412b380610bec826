//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{ProviderKind, RegisConfig};
use crate::logging::init_tracing;
use anyhow::{anyhow, Context};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Load `.env.local` then `.env` from the working directory.
///
/// Variables already set in the process environment are never replaced.
pub fn load_dotenv_files() {
    for file in [".env.local", ".env"] {
        if Path::new(file).exists() {
            if let Err(e) = dotenv::from_filename(file) {
                eprintln!("Warning: failed to read {}: {}", file, e);
            }
        }
    }
}

/// Load configuration with environment and CLI overrides
pub fn load_config_with_overrides(args: &ServeArgs) -> anyhow::Result<RegisConfig> {
    let config = if args.config.exists() {
        RegisConfig::load(Some(&args.config))?
    } else {
        RegisConfig::default()
    };

    Ok(apply_cli_overrides(config.with_env_overrides(), args))
}

/// CLI flags win over everything else.
pub fn apply_cli_overrides(mut config: RegisConfig, args: &ServeArgs) -> RegisConfig {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.safe_mode {
        config.sidecar.safe_mode = true;
    }
    if args.no_file_logs {
        config.logging.enabled = false;
    }
    config
}

/// Startup banner lines: address, key status per provider, default provider.
pub fn banner(config: &RegisConfig) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} v{}",
            "Regis AI Studio backend".bold(),
            env!("CARGO_PKG_VERSION")
        ),
        format!(
            "  Listening on http://{}:{}",
            config.server.host, config.server.port
        ),
    ];

    for kind in ProviderKind::ALL {
        let status = if !config.providers.get(kind).enabled {
            "disabled".dimmed()
        } else if config.providers.credential(kind).is_ok() {
            "✓ key configured".green()
        } else {
            format!("✗ {} not set", kind.api_key_env()).yellow()
        };
        lines.push(format!("  {:<8} {}", kind.display_name(), status));
    }

    lines.push(format!(
        "  Default provider: {}",
        config.providers.default_provider.display_name().cyan()
    ));
    lines.push(format!(
        "  Safe mode: {}",
        if config.sidecar.safe_mode {
            "on".green()
        } else {
            "off".red()
        }
    ));
    lines
}

/// Wait for SIGINT, SIGTERM, or cancellation of `cancel_token`.
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {
            tracing::info!("Shutdown requested, shutting down...");
        }
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    // 1. Environment files, then configuration
    load_dotenv_files();
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Tracing
    init_tracing(&config.logging).map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;

    tracing::info!("Starting Regis server");
    tracing::debug!(?config, "Loaded configuration");

    for line in banner(&config) {
        println!("{}", line);
    }

    // 3. Shared state and router
    let cancel_token = CancellationToken::new();
    let state = AppState::new(Arc::new(config.clone()))
        .context("Failed to build HTTP client")?
        .with_shutdown_token(cancel_token.clone());
    let app = create_router(Arc::new(state));

    // 4. Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Regis API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    tracing::info!("Regis server stopped");
    Ok(())
}
