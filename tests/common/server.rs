//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases.

use super::constants::*;
use super::fixtures::create_test_db_with_users;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use streamlyze_server::server::server::make_app;
use streamlyze_server::server::{RequestsLoggingLevel, ServerConfig};
use streamlyze_server::{HistoryStore, SqliteHistoryStore, SqliteUserStore, UserStore};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// History store for direct database access in tests
    pub history_store: Arc<SqliteHistoryStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with the default config.
    pub async fn spawn() -> Self {
        Self::spawn_with_config(ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        })
        .await
    }

    /// Spawns a test server with a custom upload ceiling, for size boundary
    /// tests that would otherwise need a 250 MiB payload.
    pub async fn spawn_with_max_upload(max_upload_bytes: u64) -> Self {
        Self::spawn_with_config(ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            max_upload_bytes,
            ..Default::default()
        })
        .await
    }

    pub async fn spawn_with_config(config: ServerConfig) -> Self {
        // Create temporary test resources
        let (temp_db_dir, user_db_path) =
            create_test_db_with_users().expect("Failed to create test database");

        let user_store: Arc<dyn UserStore> =
            Arc::new(SqliteUserStore::new(&user_db_path).expect("Failed to open user store"));

        let history_store = Arc::new(
            SqliteHistoryStore::new(temp_db_dir.path().join("history.db"))
                .expect("Failed to open history store"),
        );
        let history_store_for_test = history_store.clone();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let app = make_app(config, user_store, history_store as Arc<dyn HistoryStore>)
            .expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        // Wait for server to be ready
        let server = Self {
            base_url: base_url.clone(),
            port,
            history_store: history_store_for_test,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    // Server is ready
                    return;
                }
                _ => {
                    // Server not ready yet, wait and retry
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
