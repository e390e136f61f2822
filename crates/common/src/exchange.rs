use async_trait::async_trait;

use crate::{
    AccountInfo, Credentials, LimitOrder, MarketOrder, OrderReceipt, Result, StopLimitOrder,
};

/// Opens authenticated connections to an exchange.
///
/// `BinanceConnector` implements this against the Binance Spot REST API.
/// Tests substitute fakes that count how many handles were handed out.
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// Create a client handle for `credentials`. Performs no account check;
    /// that is the session's job.
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn ExchangeClient>>;
}

/// The capability set a live connection exposes.
///
/// Only `Session` in `crates/engine` owns a `Box<dyn ExchangeClient>`, and it
/// always calls `close` before dropping it.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fetch balances. Also used as the connectivity check when a session opens.
    async fn get_account(&self) -> Result<AccountInfo>;

    async fn place_market_order(&self, order: &MarketOrder) -> Result<OrderReceipt>;

    async fn place_limit_order(&self, order: &LimitOrder) -> Result<OrderReceipt>;

    async fn place_stop_limit_order(&self, order: &StopLimitOrder) -> Result<OrderReceipt>;

    /// Release the connection. Calls after the first are no-ops.
    async fn close(&mut self) -> Result<()>;
}
