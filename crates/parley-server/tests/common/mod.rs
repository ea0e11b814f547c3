use axum::Router;
use parley_server::{config::Config, AppState};
use tokio::net::TcpListener;

pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Serves `router` on an ephemeral local port and returns its base URL.
#[allow(dead_code)]
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Configuration with a webhook secret and no upstream credentials.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.platform.webhook_secret = WEBHOOK_SECRET.to_string();
    config
}

#[allow(dead_code)]
pub fn test_state() -> AppState {
    AppState::from_config(&test_config())
}
