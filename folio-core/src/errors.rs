use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Store IO error on {path}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::SerializationError(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for FolioError {
    fn from(err: argon2::password_hash::Error) -> Self {
        FolioError::HashingError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for FolioError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => FolioError::TokenExpired,
            _ => FolioError::InvalidToken(err.to_string()),
        }
    }
}

pub type FolioResult<T> = Result<T, FolioError>;
