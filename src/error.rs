use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("describing cluster failed: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    #[error("certificate authority data of cluster {cluster} is not valid base64: {source}")]
    Decode {
        cluster: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("minting token failed: {0}")]
    Token(#[from] TokenError),

    #[error("assembling client configuration failed: {0}")]
    Assemble(#[from] AssembleError),

    #[error("building Kubernetes client failed: {0}")]
    Client(#[from] kube::Error),

    #[error("calling the Kubernetes API failed: {0}")]
    Api(#[from] ApiCallError),

    #[error("writing report failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },

    #[error("no region configured, set one of: {}", .vars.join(", "))]
    MissingRegion { vars: Vec<&'static str> },
}

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("cluster {name} not found: {message}")]
    NotFound { name: String, message: String },

    #[error("request rejected by the control plane: {message}")]
    ClientError { message: String },

    #[error("control plane server error: {message}")]
    ServerError { message: String },

    #[error("control plane unavailable: {message}")]
    Unavailable { message: String },

    #[error("{message}")]
    Unknown { message: String },
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token input: {0}")]
    Config(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("cluster {cluster} has an empty certificate authority bundle")]
    EmptyCaBundle { cluster: String },

    #[error("bearer token for cluster {cluster} is empty")]
    EmptyToken { cluster: String },

    #[error("certificate authority bundle of cluster {cluster} is unusable: {message}")]
    InvalidCaBundle { cluster: String, message: String },

    #[error("endpoint {endpoint} is not a valid URI: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: http::uri::InvalidUri,
    },
}

#[derive(Debug, Error)]
pub enum ApiCallError {
    #[error("{namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("{message}")]
    Other { message: String },
}

impl ApiCallError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiCallError::NotFound { .. })
    }
}
