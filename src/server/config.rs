use super::RequestsLoggingLevel;

/// Inclusive ceiling for uploaded archives.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 250 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Path to a frontend build to serve statically, if any.
    pub frontend_dir_path: Option<String>,
    /// Inclusive maximum size of an uploaded archive in bytes.
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            frontend_dir_path: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
