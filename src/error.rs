use thiserror::Error;

/// Errors surfaced to callers of the optimizer.
///
/// Broken plan invariants are not represented here; those abort through assertions since
/// they indicate a bug upstream of the optimizer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptimizerError {
    #[error("table '{0}' does not exist")]
    TableNotFound(String),
    #[error("relation '{relation}' has no column named '{column}'")]
    ColumnNotFound { relation: String, column: String },
    #[error("invalid optimizer configuration: {0}")]
    InvalidConfig(String),
}

pub type OptResult<T> = anyhow::Result<T>;
