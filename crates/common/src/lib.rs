pub mod config;
pub mod error;
pub mod exchange;
pub mod types;

pub use config::{Config, Credentials};
pub use error::{Error, ErrorKind, Result, ValidationError};
pub use exchange::{ExchangeClient, ExchangeConnector};
pub use types::*;
