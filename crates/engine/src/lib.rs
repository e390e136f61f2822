pub mod binance;
pub mod executor;
pub mod session;

#[cfg(test)]
mod fake;

pub use binance::{BinanceClient, BinanceConnector};
pub use executor::OrderExecutor;
pub use session::Session;
