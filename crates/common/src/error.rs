use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid 'requests' or 'responseResolves' size")]
    InvalidInput,

    #[error("Missing environment variable: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("PrimusNetwork init failed: {0}")]
    Init(String),

    #[error("{operation} failed after {retries} retries: {last_error}")]
    RetriesExhausted {
        operation: String,
        retries: u32,
        last_error: String,
    },

    #[error("invalid attestation result")]
    InvalidAttestation,

    #[error("Unable to get plain JSON response")]
    EmptyPlainResponse,

    #[error("Gateway error: {0}")]
    Gateway(String),

    /// The inner error is part of the message, not a separate source
    #[error("ZKTLS execution failed: {0}")]
    Execution(Box<Error>),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wrap an error with the top-level orchestration prefix.
    ///
    /// Already-wrapped errors are returned as is so the prefix appears once.
    pub fn execution(inner: Error) -> Self {
        match inner {
            Error::Execution(_) => inner,
            other => Error::Execution(Box::new(other)),
        }
    }

    /// The error underneath an `Execution` wrapper, or `self`.
    pub fn root(&self) -> &Error {
        match self {
            Error::Execution(inner) => inner.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
