use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    UnknownDirective(String),
    InvalidArguments { name: String, reason: String },
    Failed(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownDirective(name) => write!(f, "unknown directive: {}", name),
            DispatchError::InvalidArguments { name, reason } => {
                write!(f, "invalid arguments for {}: {}", name, reason)
            }
            DispatchError::Failed(msg) => write!(f, "directive failed: {}", msg),
        }
    }
}

impl std::error::Error for DispatchError {}
