use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Accepts exactly `BUY` or `SELL`. Callers that want case-insensitive
/// input upper-case it first.
impl FromStr for OrderSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(ValidationError::InvalidSide(other.to_string())),
        }
    }
}

/// Which exchange capability an order goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit,
    StopLimit,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "MARKET"),
            OrderKind::Limit => write!(f, "LIMIT"),
            OrderKind::StopLimit => write!(f, "STOP-LIMIT"),
        }
    }
}

/// Trims the symbol and rejects it when nothing is left.
/// Unknown symbols are left for the exchange to reject.
pub fn validate_symbol(symbol: &str) -> Result<String, ValidationError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }
    Ok(symbol.to_string())
}

pub fn validate_positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive { field, value })
    }
}

/// Parse user text as a positive finite number.
pub fn parse_positive(field: &'static str, input: &str) -> Result<f64, ValidationError> {
    let value = input
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NotANumber {
            field,
            input: input.trim().to_string(),
        })?;
    validate_positive(field, value)
}

fn new_client_order_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Market order, executed immediately at the best available price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOrder {
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
}

impl MarketOrder {
    pub fn new(symbol: &str, side: OrderSide, quantity: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            client_order_id: new_client_order_id(),
            symbol: validate_symbol(symbol)?,
            side,
            quantity: validate_positive("quantity", quantity)?,
        })
    }
}

/// Good-till-cancelled limit order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitOrder {
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
}

impl LimitOrder {
    pub fn new(
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        price: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            client_order_id: new_client_order_id(),
            symbol: validate_symbol(symbol)?,
            side,
            quantity: validate_positive("quantity", quantity)?,
            price: validate_positive("price", price)?,
        })
    }
}

/// Limit order that only becomes active once `stop_price` is reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopLimitOrder {
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub stop_price: f64,
}

impl StopLimitOrder {
    pub fn new(
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        price: f64,
        stop_price: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            client_order_id: new_client_order_id(),
            symbol: validate_symbol(symbol)?,
            side,
            quantity: validate_positive("quantity", quantity)?,
            price: validate_positive("price", price)?,
            stop_price: validate_positive("stop price", stop_price)?,
        })
    }
}

/// Order record returned by the exchange. Only displayed, never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    pub side: OrderSide,
    /// Exchange order type, e.g. `MARKET`, `LIMIT`, `STOP_LOSS_LIMIT`.
    pub order_type: String,
    pub status: String,
    pub price: String,
    pub stop_price: Option<String>,
    pub orig_qty: String,
    pub executed_qty: String,
    pub transact_time: Option<DateTime<Utc>>,
}

/// One asset line of the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
}

impl Balance {
    pub fn is_empty(&self) -> bool {
        self.free <= 0.0 && self.locked <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub can_trade: bool,
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    /// Balances with anything free or locked.
    pub fn non_zero_balances(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(|b| !b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parses_exact_tokens_only() {
        assert_eq!("BUY".parse::<OrderSide>(), Ok(OrderSide::Buy));
        assert_eq!("SELL".parse::<OrderSide>(), Ok(OrderSide::Sell));
        assert_eq!(
            "buy".parse::<OrderSide>(),
            Err(ValidationError::InvalidSide("buy".into()))
        );
    }

    #[test]
    fn market_order_trims_symbol() {
        let order = MarketOrder::new("  BTCUSDT ", OrderSide::Buy, 0.01).unwrap();
        assert_eq!(order.symbol, "BTCUSDT");
        assert_eq!(order.client_order_id.len(), 36);
    }

    #[test]
    fn empty_symbol_rejected() {
        assert_eq!(
            MarketOrder::new("   ", OrderSide::Sell, 1.0),
            Err(ValidationError::EmptySymbol)
        );
    }

    #[test]
    fn stop_limit_requires_positive_stop_price() {
        let err = StopLimitOrder::new("BTCUSDT", OrderSide::Sell, 0.5, 60_000.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NotPositive {
                field: "stop price",
                ..
            }
        ));
    }

    #[test]
    fn limit_rejects_nan_price() {
        assert!(LimitOrder::new("ETHUSDT", OrderSide::Buy, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn parse_positive_reports_field_and_input() {
        let err = parse_positive("quantity", " abc ").unwrap_err();
        assert_eq!(err.to_string(), "quantity must be a number, got 'abc'");
        assert_eq!(parse_positive("price", "42.5"), Ok(42.5));
    }

    #[test]
    fn only_non_zero_balances_listed() {
        let account = AccountInfo {
            can_trade: true,
            balances: vec![
                Balance { asset: "BTC".into(), free: 0.0, locked: 0.0 },
                Balance { asset: "USDT".into(), free: 100.0, locked: 5.0 },
                Balance { asset: "BNB".into(), free: 0.0, locked: 1.5 },
            ],
        };
        let assets: Vec<_> = account.non_zero_balances().map(|b| b.asset.as_str()).collect();
        assert_eq!(assets, vec!["USDT", "BNB"]);
    }
}
