use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokenpool::adapters::metrics_handler::MetricsCollector;
use tokenpool::cli::{parse_import_lines, Cli, Command};
use tokenpool::config::Settings;
use tokenpool::persistence::{parse_tokens, ConnectionPool, SqlxTokenRepository, TokenRepository};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.env_filter())
        .init();

    let settings = Settings::new_with_cli(&cli)?;

    let pool = ConnectionPool::open(&settings.storage).await?;
    if settings.storage.create_schema {
        pool.ensure_schema(&settings.storage.table, &settings.storage.column)
            .await?;
    }
    let repository = Arc::new(SqlxTokenRepository::from_config(
        pool.clone(),
        &settings.storage,
    )?);

    let result = match cli.command() {
        Command::Serve => serve(&settings, repository).await,
        Command::Provision { count, length } => {
            for token in repository.provision(count, length).await? {
                println!("{}", token);
            }
            Ok(())
        }
        Command::Import { file } => {
            let content = std::fs::read_to_string(&file)?;
            let tokens = parse_tokens(parse_import_lines(&content))?;
            let report = repository.insert(&tokens).await?;
            println!("inserted {} skipped {}", report.inserted, report.skipped);
            Ok(())
        }
        Command::Count => {
            println!("{}", repository.count().await?);
            Ok(())
        }
    };

    pool.close().await;
    result
}

async fn serve(settings: &Settings, repository: Arc<SqlxTokenRepository>) -> anyhow::Result<()> {
    let remaining = repository.count().await?;
    info!(remaining, "Starting tokenpool on {}:{}", settings.server.host, settings.server.port);

    let metrics = Arc::new(MetricsCollector::new()?);
    let app = tokenpool::create_app(repository, metrics, settings)?;

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
