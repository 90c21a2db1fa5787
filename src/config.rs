use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Medispatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bounded reload-and-retry on optimistic-concurrency conflicts.
pub const MAX_CONFLICT_RETRIES: u32 = 3;

/// Maximum retries per external notification attempt after the first send.
pub const MAX_NOTIFY_RETRIES: u32 = 3;

/// Pause between external notification retry rounds.
pub const NOTIFY_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Buffered events per broadcast topic before slow subscribers lag.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "medispatch=info,tower_http=warn"
}

/// Get the application data directory
/// ~/Medispatch/ on all platforms
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Medispatch")
}

/// Path of the emergency record database.
/// Overridable with MEDISPATCH_DB for containerized deployments.
pub fn database_path() -> PathBuf {
    match std::env::var("MEDISPATCH_DB") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir().join("medispatch.db"),
    }
}

/// Socket address the HTTP/WebSocket server binds to.
/// Overridable with MEDISPATCH_ADDR.
pub fn bind_addr() -> SocketAddr {
    std::env::var("MEDISPATCH_ADDR")
        .ok()
        .and_then(|addr| addr.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8470)))
}

/// Webhook endpoint for external notification delivery (SMS/email/push
/// gateway). None disables outbound delivery; attempts are still recorded.
pub fn notify_webhook() -> Option<String> {
    std::env::var("MEDISPATCH_NOTIFY_WEBHOOK")
        .ok()
        .filter(|url| !url.is_empty())
}
