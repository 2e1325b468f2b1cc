//! Errors raised by the core primitives.

/// Errors that can occur in window application or name parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A destination or source slice is shorter than the operation requires.
    BufferTooShort {
        /// Elements the operation needs.
        required: usize,
        /// Elements actually supplied.
        actual: usize,
    },
    /// A name did not match any known variant.
    UnknownName {
        /// What was being parsed ("window", "scale").
        kind: &'static str,
        /// The rejected input.
        name: String,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BufferTooShort { required, actual } => {
                write!(f, "buffer too short: need {required} elements, got {actual}")
            }
            Self::UnknownName { kind, name } => write!(f, "unknown {kind} '{name}'"),
        }
    }
}

impl std::error::Error for CoreError {}
