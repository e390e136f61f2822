//! Scripted in-memory exchange for unit tests.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use common::{
    AccountInfo, Balance, Credentials, Error, ExchangeClient, ExchangeConnector, LimitOrder,
    MarketOrder, OrderReceipt, OrderSide, Result, StopLimitOrder,
};

pub const FAKE_ORDER_ID: u64 = 4242;

#[derive(Debug, Clone, Default)]
pub struct FakeStats {
    pub connects: usize,
    pub closes: usize,
    pub account_queries: usize,
    pub market_orders: usize,
    pub limit_orders: usize,
    pub stop_limit_orders: usize,
}

#[derive(Clone, Default)]
pub struct FakeExchange {
    pub fail_connect: bool,
    pub fail_account: bool,
    /// Reject every order with this `(code, msg)`.
    pub reject_orders: Option<(i64, String)>,
    /// Fail every order with an unclassified error.
    pub garble_orders: bool,
    pub balances: Vec<Balance>,
    pub(crate) stats: Arc<Mutex<FakeStats>>,
}

impl FakeExchange {
    pub fn connector(&self) -> Arc<dyn ExchangeConnector> {
        Arc::new(self.clone())
    }

    pub fn stats(&self) -> FakeStats {
        self.stats.lock().unwrap().clone()
    }

    fn record(&self, f: impl FnOnce(&mut FakeStats)) {
        f(&mut *self.stats.lock().unwrap());
    }

    fn order_outcome(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: &str,
        status: &str,
        price: f64,
        stop_price: Option<f64>,
    ) -> Result<OrderReceipt> {
        if let Some((code, msg)) = &self.reject_orders {
            return Err(Error::ExchangeRejection {
                code: *code,
                msg: msg.clone(),
            });
        }
        if self.garble_orders {
            return Err(Error::Exchange("missing field `orderId`".into()));
        }
        Ok(OrderReceipt {
            symbol: symbol.to_string(),
            order_id: FAKE_ORDER_ID,
            client_order_id: "fake-client-id".into(),
            side,
            order_type: order_type.to_string(),
            status: status.to_string(),
            price: format!("{price:.8}"),
            stop_price: stop_price.map(|p| format!("{p:.8}")),
            orig_qty: "0.01000000".into(),
            executed_qty: "0.00000000".into(),
            transact_time: None,
        })
    }
}

#[async_trait]
impl ExchangeConnector for FakeExchange {
    async fn connect(&self, _credentials: &Credentials) -> Result<Box<dyn ExchangeClient>> {
        if self.fail_connect {
            return Err(Error::Http("connection refused".into()));
        }
        self.record(|s| s.connects += 1);
        Ok(Box::new(FakeClient {
            exchange: self.clone(),
            closed: false,
        }))
    }
}

struct FakeClient {
    exchange: FakeExchange,
    closed: bool,
}

#[async_trait]
impl ExchangeClient for FakeClient {
    async fn get_account(&self) -> Result<AccountInfo> {
        self.exchange.record(|s| s.account_queries += 1);
        if self.exchange.fail_account {
            return Err(Error::ExchangeRejection {
                code: -2015,
                msg: "Invalid API-key, IP, or permissions for action.".into(),
            });
        }
        Ok(AccountInfo {
            can_trade: true,
            balances: self.exchange.balances.clone(),
        })
    }

    async fn place_market_order(&self, order: &MarketOrder) -> Result<OrderReceipt> {
        self.exchange.record(|s| s.market_orders += 1);
        self.exchange
            .order_outcome(&order.symbol, order.side, "MARKET", "FILLED", 0.0, None)
    }

    async fn place_limit_order(&self, order: &LimitOrder) -> Result<OrderReceipt> {
        self.exchange.record(|s| s.limit_orders += 1);
        self.exchange
            .order_outcome(&order.symbol, order.side, "LIMIT", "NEW", order.price, None)
    }

    async fn place_stop_limit_order(&self, order: &StopLimitOrder) -> Result<OrderReceipt> {
        self.exchange.record(|s| s.stop_limit_orders += 1);
        self.exchange.order_outcome(
            &order.symbol,
            order.side,
            "STOP_LOSS_LIMIT",
            "NEW",
            order.price,
            Some(order.stop_price),
        )
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.exchange.record(|s| s.closes += 1);
        }
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        api_key: "test-key".into(),
        secret_key: "test-secret".into(),
        base_url: Url::parse(crate::binance::TESTNET_BASE_URL).unwrap(),
        testnet: true,
    }
}

/// Shared sink for a scoped `tracing` subscriber, so tests can read what was logged.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Install a plain-text subscriber writing here for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
