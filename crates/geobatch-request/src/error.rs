#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid client id {0:?}: expected prefix \"gme-\"")]
    InvalidClientId(String),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, RequestError>;
