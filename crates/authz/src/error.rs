use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is malformed")]
    MalformedToken,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("{0}")]
    Forbidden(&'static str),
}
