use thiserror::Error;

#[derive(Debug, Error)]
pub enum KinshipError {
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("validation error: {message}")]
    Validation { message: String },
    #[error("conflict: {message}")]
    Conflict { message: String },
    #[error("unknown facet: {path}")]
    UnknownFacet { path: String },
}

impl KinshipError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unknown_facet(path: impl Into<String>) -> Self {
        Self::UnknownFacet { path: path.into() }
    }

    /// True when the request itself is at fault and retrying it unchanged cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::UnknownFacet { .. })
    }
}

pub type KinshipResult<T> = Result<T, KinshipError>;

impl From<sea_orm::DbErr> for KinshipError {
    fn from(value: sea_orm::DbErr) -> Self {
        KinshipError::storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::KinshipError;

    #[test]
    fn helper_constructors_set_variants() {
        let err = KinshipError::storage("disk");
        assert!(matches!(err, KinshipError::Storage { .. }));
        let err = KinshipError::not_found("missing");
        assert!(matches!(err, KinshipError::NotFound { .. }));
        let err = KinshipError::invalid("bad");
        assert!(matches!(err, KinshipError::Validation { .. }));
        let err = KinshipError::conflict("dup");
        assert!(matches!(err, KinshipError::Conflict { .. }));
        let err = KinshipError::unknown_facet("bogus.path");
        assert!(matches!(err, KinshipError::UnknownFacet { ref path } if path == "bogus.path"));
    }

    #[test]
    fn client_errors_are_input_failures_only() {
        assert!(KinshipError::invalid("bad").is_client_error());
        assert!(KinshipError::unknown_facet("x").is_client_error());
        assert!(!KinshipError::storage("disk").is_client_error());
        assert!(!KinshipError::conflict("dup").is_client_error());
    }

    #[test]
    fn unknown_facet_message_names_the_path() {
        let err = KinshipError::unknown_facet("bogus.path");
        assert_eq!(err.to_string(), "unknown facet: bogus.path");
    }
}
