use thiserror::Error;
use tgw_fabric::FabricError;

pub type Result<T> = std::result::Result<T, MatrixError>;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Route query failed: {0}")]
    Fabric(#[from] FabricError),

    #[error("Classification task failed: {0}")]
    Task(String),
}
