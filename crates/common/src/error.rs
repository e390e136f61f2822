use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Exchange rejected request (code {code}): {msg}")]
    ExchangeRejection { code: i64, msg: String },

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification used at the operation boundary to decide how a
/// failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Connection,
    ExchangeRejection,
    Unknown,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Connection(_) | Error::Http(_) => ErrorKind::Connection,
            Error::ExchangeRejection { .. } => ErrorKind::ExchangeRejection,
            Error::Exchange(_)
            | Error::Json(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Other(_) => ErrorKind::Unknown,
        }
    }
}

/// Malformed user input, caught before anything is sent to the exchange.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("side must be BUY or SELL, got '{0}'")]
    InvalidSide(String),

    #[error("{field} must be a number, got '{input}'")]
    NotANumber { field: &'static str, input: String },

    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}
