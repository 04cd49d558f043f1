mod cli;

use anyhow::{anyhow, Context};
use gh_rate_limit_exporter::config::Config;
use gh_rate_limit_exporter::credentials::{CredentialSource, FileCredentialSource};
use gh_rate_limit_exporter::metrics::{self, HandlerInstrumenter, HttpClientInstrumenter};
use gh_rate_limit_exporter::server::{self, AppState};
use gh_rate_limit_exporter::{http, Collector, GitHubSourceFactory};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("gh-rate-limit-exporter {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::from_env()
        .map_err(|e| anyhow!(e))?
        .with_overrides(
            matches.get_one::<String>("listen").cloned(),
            matches.get_one::<PathBuf>("credentials").cloned(),
        );

    let credentials = FileCredentialSource::load(&config.credentials_path)?.credentials();

    let registry = metrics::shared_registry()?;
    let client_instrumenter = HttpClientInstrumenter::new(&registry)?;
    let handler_instrumenter = HandlerInstrumenter::new(&registry)?;
    let client = http::build_client(&config).context("building GitHub HTTP client")?;
    let factory = GitHubSourceFactory::new(client, config.clone(), client_instrumenter);

    let collector = Arc::new(Collector::new(credentials, Arc::new(factory))?);
    collector.start();

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    let state = AppState {
        collector: collector.clone(),
        registry,
        instrumenter: handler_instrumenter,
    };
    server::serve(listener, state, shutdown_signal(collector)).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal(collector: Arc<Collector>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("signal received, starting graceful shutdown");
    collector.shutdown();
}
