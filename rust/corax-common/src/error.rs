use thiserror::Error;

/// Error of every corax-* operation. The kind is boxed to keep `Result`s of
/// small values small.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The caller broke a precondition.
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    /// The operation exists but this component does not provide it, e.g.
    /// writing dynamic fields.
    #[error("not supported: {message}")]
    NotSupported { message: String },

    /// Persisted bytes are corrupt or violate an invariant of their format.
    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    /// A buffer or a count limit is too small for the data.
    #[error("capacity exceeded for '{element}': {message}")]
    CapacityExceeded { element: String, message: String },
}

impl Error {
    fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::InvalidArgument {
            name: name.into(),
            message: message.into(),
        })
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error::new(ErrorKind::InvalidOperation { name: name.into() })
    }

    pub fn not_supported(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::NotSupported {
            message: message.into(),
        })
    }

    /// Corruption of `element`. Never retried.
    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::InvalidFormat {
            element: element.into(),
            message: message.into(),
        })
    }

    pub fn capacity_exceeded(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::CapacityExceeded {
            element: element.into(),
            message: message.into(),
        })
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotSupported { .. })
    }

    pub fn is_invalid_format(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidFormat { .. })
    }

    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self.kind(), ErrorKind::CapacityExceeded { .. })
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinguishable() {
        let err = Error::not_supported("dynamic fields");
        assert!(err.is_not_supported());
        assert!(!err.is_invalid_format());
        assert_eq!(err.to_string(), "not supported: dynamic fields");

        let err = Error::invalid_format("pfor", "header 0b11");
        assert!(err.is_invalid_format());
        assert!(matches!(err.into_kind(), ErrorKind::InvalidFormat { .. }));

        let err = Error::capacity_exceeded("output", "run of 128 into 64 slots");
        assert!(err.is_capacity_exceeded());
        assert_eq!(
            err.to_string(),
            "capacity exceeded for 'output': run of 128 into 64 slots"
        );

        let err: Error = ErrorKind::InvalidOperation {
            name: "finish".into(),
        }
        .into();
        assert_eq!(err.to_string(), "invalid operation finish");
    }
}
