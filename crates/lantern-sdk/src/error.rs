//! Error types for runtime calls made through the extension ABI

/// Result type for [`EngineContext`](crate::context::EngineContext) calls
pub type AbiResult<T> = Result<T, AbiError>;

/// Failure reported by the runtime
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AbiError {
    /// Allocation failed
    #[error("Out of memory")]
    OutOfMemory,

    /// The runtime has no class identifiers left
    #[error("Class identifiers exhausted")]
    ClassIdsExhausted,

    /// Type registration was rejected
    #[error("Class registration failed: {0}")]
    ClassRegistration(String),

    /// Installing properties on an object failed
    #[error("Property definition failed: {0}")]
    Property(String),

    /// Module record creation, export declaration or export binding failed
    #[error("Module error: {0}")]
    Module(String),

    /// Source text did not compile
    #[error("Compile error: {0}")]
    Compile(String),

    /// A runtime exception is pending
    #[error("Exception pending")]
    Exception,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<String> for AbiError {
    fn from(s: String) -> Self {
        AbiError::Other(s)
    }
}

impl From<&str> for AbiError {
    fn from(s: &str) -> Self {
        AbiError::Other(s.to_string())
    }
}
