//! Error types for geobatch.

use geobatch_dispatch::DispatchError;
use geobatch_record::IngestFailure;
use geobatch_request::RequestError;

#[derive(Debug, thiserror::Error)]
pub enum GeobatchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Ingest(#[from] IngestFailure),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("pipeline task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, GeobatchError>;
