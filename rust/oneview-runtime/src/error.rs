use thiserror::Error;

/// Rejected input to a view state store operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("view name must not be empty")]
    EmptyViewName,

    #[error("instance id must not be empty for view '{view}'")]
    EmptyInstanceId { view: String },

    #[error("invalid event type '{0}': expected an identifier such as 'click'")]
    InvalidEventType(String),

    #[error("invalid state key '{0}'")]
    InvalidStateKey(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
