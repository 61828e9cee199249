//! Error handling for the host pulse sampler.

/// A specialized `Result` type for host pulse operations.
pub type Result<T> = std::result::Result<T, HealthError>;

/// The main error type for host pulse operations.
///
/// Read failures inside the sampler never escape a tick: they are logged and
/// the affected field keeps its previous value. This type mostly travels
/// between the platform sources and the sampler core, and out of the web
/// server setup.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Counter table could not be parsed
    #[error("Failed to parse system counters: {0}")]
    ParseError(String),

    /// The metric cannot be measured on this platform
    #[error("Metric not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// A filesystem or mount point could not be found
    #[error("Filesystem not found: {0}")]
    FilesystemNotFound(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HealthError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a new filesystem-not-found error
    pub fn filesystem_not_found(mount_point: impl Into<String>) -> Self {
        Self::FilesystemNotFound(mount_point.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether retrying on a later tick can ever succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
