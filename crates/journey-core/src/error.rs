use std::fmt;

use crate::token::TokenCategory;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Every instance slot of the category pool is held by a live token.
    PoolExhausted {
        category: TokenCategory,
        capacity: usize,
    },
    InvalidConfig(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::PoolExhausted { category, capacity } => {
                write!(f, "{category} instance pool exhausted (capacity {capacity})")
            }
            EngineError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Failure reported by a render backend while releasing a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposeError {
    pub resource: String,
    pub reason: String,
}

impl DisposeError {
    pub fn new(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DisposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to dispose {}: {}", self.resource, self.reason)
    }
}

impl std::error::Error for DisposeError {}

pub type Result<T> = std::result::Result<T, EngineError>;
