use rmcp::{ServiceExt, transport::stdio};

use refactoraptor::config::Config;
use refactoraptor::server::RefactoraptorServer;
use refactoraptor::service::RefactorService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Load .env from the binary's directory (MCP servers may start with any CWD),
    // falling back to dotenvy's CWD search.
    let exe_env = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(".env")))
        .filter(|path| path.exists());
    match exe_env {
        Some(path) => {
            dotenvy::from_path(&path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing::info!("refactoraptor starting");

    let config = Config::load();
    tracing::debug!(?config, "configuration loaded");
    let service = RefactorService::from_config(&config)?;
    let server = RefactoraptorServer::new(service);

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {e:?}"))?;

    service.waiting().await?;

    tracing::info!("refactoraptor shutting down");
    Ok(())
}
