use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid value at {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StateStoreError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        StateStoreError::InvalidArgument(msg.into())
    }

    /// Create an invalid value error for the given key
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        StateStoreError::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Short label used for the `error_type` metric dimension
    pub fn kind(&self) -> &'static str {
        match self {
            StateStoreError::Redis(e) if e.is_timeout() => "timeout",
            StateStoreError::Redis(e) if e.is_io_error() || e.is_connection_dropped() => {
                "connection"
            }
            StateStoreError::Redis(_) => "redis",
            StateStoreError::InvalidArgument(_) => "invalid_argument",
            StateStoreError::InvalidValue { .. } => "invalid_value",
            StateStoreError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, StateStoreError>;
