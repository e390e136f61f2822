mod rest;

pub use rest::{sign_query, BinanceClient, BinanceConnector, TESTNET_BASE_URL};
