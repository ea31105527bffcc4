use thiserror::Error;

pub type Result<T> = std::result::Result<T, FabricError>;

#[derive(Error, Debug)]
pub enum FabricError {
    #[error("{operation} failed: {message}")]
    Source { operation: String, message: String },

    #[error("Route table not found: {0}")]
    RouteTableNotFound(String),

    #[error("Attachment {0} has no Name tag")]
    MissingNameTag(String),

    #[error("Invalid alias file {path}: {message}")]
    InvalidAliases { path: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl FabricError {
    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
