use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FuseErrorCode {
    InvalidArgument,
    DecodeFailed,
    Internal,
    NotFound,
    PermissionDenied,
    Unauthenticated,
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
}

impl FuseErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuseErrorCode::InvalidArgument => "fuse/invalid-argument",
            FuseErrorCode::DecodeFailed => "fuse/decode-failed",
            FuseErrorCode::Internal => "fuse/internal",
            FuseErrorCode::NotFound => "fuse/not-found",
            FuseErrorCode::PermissionDenied => "fuse/permission-denied",
            FuseErrorCode::Unauthenticated => "fuse/unauthenticated",
            FuseErrorCode::Unavailable => "fuse/unavailable",
            FuseErrorCode::DeadlineExceeded => "fuse/deadline-exceeded",
            FuseErrorCode::ResourceExhausted => "fuse/resource-exhausted",
        }
    }
}

/// Error surfaced by the fuse layer.
///
/// Store failures travel through unchanged; the layer itself only produces
/// `InvalidArgument` and `DecodeFailed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuseError {
    pub code: FuseErrorCode,
    message: String,
}

impl FuseError {
    pub fn new(code: FuseErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the error came from the codec rather than the store.
    pub fn is_decode_error(&self) -> bool {
        self.code == FuseErrorCode::DecodeFailed
    }
}

impl Display for FuseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for FuseError {}

pub type FuseResult<T> = Result<T, FuseError>;

pub fn invalid_argument(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::InvalidArgument, message)
}

pub fn decode_error(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::DecodeFailed, message)
}

pub fn internal_error(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::Internal, message)
}

pub fn not_found(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::NotFound, message)
}

pub fn permission_denied(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::PermissionDenied, message)
}

pub fn unauthenticated(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::Unauthenticated, message)
}

pub fn unavailable(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::Unavailable, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::DeadlineExceeded, message)
}

pub fn resource_exhausted(message: impl Into<String>) -> FuseError {
    FuseError::new(FuseErrorCode::ResourceExhausted, message)
}
