use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration for the upload service
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: "0.0.0.0")
    pub host: String,

    /// Listen port (default: 3000)
    pub port: u16,

    /// Folder uploaded files are written into (default: "downloads")
    pub downloads_folder: PathBuf,

    /// Minimum time between two progress events for the same file (default: 200 ms)
    pub progress_interval: Duration,

    /// Maximum accepted request body in bytes (default: 1 GB)
    pub max_request_size: usize,

    /// Buffered notifications per room before slow listeners start lagging (default: 64)
    pub notification_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            downloads_folder: PathBuf::from("downloads"),
            progress_interval: Duration::from_millis(200),
            max_request_size: 1024 * 1024 * 1024, // 1 GB
            notification_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(default.host),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            downloads_folder: env::var("DOWNLOADS_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(default.downloads_folder),

            progress_interval: env::var("PROGRESS_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.progress_interval),

            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_request_size),

            notification_capacity: env::var("NOTIFICATION_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(default.notification_capacity),
        }
    }

    /// Create config for development and tests (local folder, fast progress)
    pub fn development() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            downloads_folder: env::temp_dir().join("rust-upload-progress"),
            progress_interval: Duration::from_millis(2),
            max_request_size: 64 * 1024 * 1024,
            notification_capacity: 256,
        }
    }

    /// Override the destination folder, keeping everything else
    pub fn with_downloads_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.downloads_folder = folder.into();
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
