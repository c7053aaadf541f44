use crate::crd::platform::PlatformType;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // Kubernetes
    #[error("Kubernetes error {0}")]
    Kube(#[from] kube::Error),
    #[error("Invalid kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    // Input validation
    #[error("\"{label}\" label doesn't exist in {kind} {name}")]
    MissingLabel {
        label: String,
        kind: String,
        name: String,
    },
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Platform type {declared} does not match the populated platform spec: {reason}")]
    PlatformMismatch {
        declared: PlatformType,
        reason: String,
    },
    #[error("Invalid value for {option}: {reason}")]
    InvalidOption { option: String, reason: String },
    #[error("No image for component {0} in the release payload")]
    MissingComponentImage(String),
    #[error("Error parsing CIDR: {0}")]
    ParseNetwork(#[from] ipnet::AddrParseError),
    #[error("NodePool {0} already exists")]
    NodePoolAlreadyExists(String),
    #[error("HostedCluster {0} not found")]
    HostedClusterNotFound(String),

    // Serialization
    #[error("Failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: String,
        source: serde_yaml::Error,
    },
    #[error("JSON error {0}")]
    Json(#[from] serde_json::Error),

    // Configuration
    #[error("Unknown platform {0}")]
    UnknownPlatform(String),
    #[error("Platform {0} has no node pool support")]
    UnsupportedPlatform(PlatformType),
    #[error("Failed to load operator configuration from {path}: {reason}")]
    Config { path: String, reason: String },

    // Cancellation is a terminal outcome of its own, not a failure
    #[error("Operation cancelled")]
    Cancelled,

    // Misc
    #[error("Trace exporter error: {0}")]
    Trace(#[from] opentelemetry::trace::TraceError),
    #[error("Failed to install tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
    #[error("Timed out waiting for operation: {0}")]
    Timeout(String),
    #[error("Task ended unexpectedly: {0}")]
    UnexpectedExit(String),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
