use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokenpool::adapters::metrics_handler::MetricsCollector;
use tokenpool::config::Settings;
use tokenpool::persistence::{
    parse_tokens, ConnectionPool, SqlxTokenRepository, StorageConfig, TokenRepository,
};

pub struct TestServer {
    pub addr: SocketAddr,
    pub base_url: String,
    pub repository: Arc<SqlxTokenRepository>,
    _dir: TempDir,
}

impl TestServer {
    /// Serve a fresh file-backed pool seeded with `tokens` on a random port
    pub async fn with_tokens(tokens: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut settings = Settings::default();
        settings.server.port = 0;
        settings.storage = StorageConfig {
            url: format!("sqlite://{}", dir.path().join("tokens.db").display()),
            ..Default::default()
        };

        let pool = ConnectionPool::open(&settings.storage).await.unwrap();
        pool.ensure_schema(&settings.storage.table, &settings.storage.column)
            .await
            .unwrap();
        let repository =
            Arc::new(SqlxTokenRepository::from_config(pool, &settings.storage).unwrap());
        if !tokens.is_empty() {
            repository
                .insert(&parse_tokens(tokens.iter().copied()).unwrap())
                .await
                .unwrap();
        }

        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let app = tokenpool::create_app(repository.clone(), metrics, &settings).unwrap();

        // Start server on random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            addr,
            base_url,
            repository,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
