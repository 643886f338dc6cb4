use thiserror::Error;

/// Raised while building the plugin configuration. Only surfaces at registration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid ignoreUsers pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Options parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single collector submission. Never crosses into the host.
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Collector returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No API key configured for platform '{0}'")]
    MissingApiKey(String),

    #[error("Unsupported platform '{0}'")]
    UnsupportedPlatform(String),

    #[error("No async runtime available to issue the submission")]
    NoRuntime,

    #[error("Send task failed: {0}")]
    Join(String),
}
