use thiserror::Error;

pub type Result<T> = std::result::Result<T, MrError>;

#[derive(Error, Debug)]
pub enum MrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("bad intermediate file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("listing intermediate files failed: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("worker is not connected to a coordinator")]
    NotConnected,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
