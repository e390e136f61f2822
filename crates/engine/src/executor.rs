use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use tracing::{error, info, warn};

use common::{
    AccountInfo, Credentials, Error, ErrorKind, ExchangeConnector, LimitOrder, MarketOrder,
    OrderKind, OrderReceipt, Result, StopLimitOrder,
};

use crate::session::Session;

/// Console sink for receipts and balances.
pub type Output<'a> = &'a mut (dyn Write + Send);

/// Runs one exchange operation per call, each inside its own session.
///
/// Every public method opens a fresh session, closes it before returning, and
/// never propagates an error: failures are logged and reported as `None`.
pub struct OrderExecutor {
    connector: Arc<dyn ExchangeConnector>,
    credentials: Credentials,
}

enum Ticket<'a> {
    Market(&'a MarketOrder),
    Limit(&'a LimitOrder),
    StopLimit(&'a StopLimitOrder),
}

impl Ticket<'_> {
    fn kind(&self) -> OrderKind {
        match self {
            Ticket::Market(_) => OrderKind::Market,
            Ticket::Limit(_) => OrderKind::Limit,
            Ticket::StopLimit(_) => OrderKind::StopLimit,
        }
    }
}

impl OrderExecutor {
    pub fn new(connector: Arc<dyn ExchangeConnector>, credentials: Credentials) -> Self {
        Self {
            connector,
            credentials,
        }
    }

    pub async fn place_market_order(
        &self,
        out: Output<'_>,
        order: &MarketOrder,
    ) -> Option<OrderReceipt> {
        info!(
            client_order_id = %order.client_order_id,
            "Attempting to place a MARKET {} order for {} {}...",
            order.side, order.quantity, order.symbol
        );
        self.execute(out, Ticket::Market(order)).await
    }

    pub async fn place_limit_order(
        &self,
        out: Output<'_>,
        order: &LimitOrder,
    ) -> Option<OrderReceipt> {
        info!(
            client_order_id = %order.client_order_id,
            "Attempting to place a LIMIT {} order for {} {} at price {}...",
            order.side, order.quantity, order.symbol, order.price
        );
        self.execute(out, Ticket::Limit(order)).await
    }

    pub async fn place_stop_limit_order(
        &self,
        out: Output<'_>,
        order: &StopLimitOrder,
    ) -> Option<OrderReceipt> {
        info!(
            client_order_id = %order.client_order_id,
            "Attempting to place a STOP-LIMIT {} order for {} {} with stop price {} and limit price {}...",
            order.side, order.quantity, order.symbol, order.stop_price, order.price
        );
        self.execute(out, Ticket::StopLimit(order)).await
    }

    /// Print every asset with a free or locked balance.
    pub async fn display_account_info(&self, out: Output<'_>) -> Option<AccountInfo> {
        let mut session = Session::new(self.connector.clone());
        let result = self.fetch_account(&mut session).await;
        session.close().await;

        match result {
            Ok(account) => {
                write_output(out, &render_balances(&account));
                info!("Successfully fetched and displayed account info.");
                Some(account)
            }
            Err(e) => {
                report_failure("fetching account info", &e);
                None
            }
        }
    }

    async fn execute(&self, out: Output<'_>, ticket: Ticket<'_>) -> Option<OrderReceipt> {
        let label = ticket.kind().to_string().to_lowercase();

        let mut session = Session::new(self.connector.clone());
        let result = self.submit(&mut session, &ticket).await;
        session.close().await;

        match result {
            Ok(receipt) => {
                info!(
                    order_id = receipt.order_id,
                    status = %receipt.status,
                    "Successfully placed {label} order."
                );
                write_output(out, &render_receipt(ticket.kind(), &receipt));
                Some(receipt)
            }
            Err(e) => {
                report_failure(&format!("placing {label} order"), &e);
                None
            }
        }
    }

    async fn submit(&self, session: &mut Session, ticket: &Ticket<'_>) -> Result<OrderReceipt> {
        let client = session.open(&self.credentials).await?;
        match ticket {
            Ticket::Market(order) => client.place_market_order(order).await,
            Ticket::Limit(order) => client.place_limit_order(order).await,
            Ticket::StopLimit(order) => client.place_stop_limit_order(order).await,
        }
    }

    async fn fetch_account(&self, session: &mut Session) -> Result<AccountInfo> {
        let client = session.open(&self.credentials).await?;
        info!("Fetching account information...");
        client.get_account().await
    }
}

fn report_failure(action: &str, err: &Error) {
    match err.kind() {
        ErrorKind::Validation => warn!(error = %err, "Invalid request while {action}"),
        ErrorKind::Connection => error!(error = %err, "Connection error while {action}"),
        ErrorKind::ExchangeRejection => error!(error = %err, "API Error {action}"),
        ErrorKind::Unknown => error!(error = %err, "An unexpected error occurred {action}"),
    }
}

fn write_output(out: Output<'_>, text: &str) {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        warn!(error = %e, "Failed to write to console");
    }
}

pub fn render_receipt(kind: OrderKind, receipt: &OrderReceipt) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "--- Order Details ---");
    let _ = writeln!(text, "  Symbol: {}", receipt.symbol);
    let _ = writeln!(text, "  Order ID: {}", receipt.order_id);
    let _ = writeln!(text, "  Side: {}", receipt.side);
    let _ = writeln!(text, "  Type: {}", receipt.order_type);
    match kind {
        OrderKind::Market => {}
        OrderKind::Limit => {
            let _ = writeln!(text, "  Price: {}", receipt.price);
        }
        OrderKind::StopLimit => {
            let _ = writeln!(text, "  Limit Price: {}", receipt.price);
            let _ = writeln!(
                text,
                "  Stop Price: {}",
                receipt.stop_price.as_deref().unwrap_or("-")
            );
        }
    }
    let _ = writeln!(text, "  Status: {}", receipt.status);
    let _ = writeln!(text, "---------------------");
    text
}

pub fn render_balances(account: &AccountInfo) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "\n--- Spot Account Balances ---");
    for balance in account.non_zero_balances() {
        let _ = writeln!(
            text,
            "  - Asset: {:<6} | Available: {:<15.8} | In Orders: {:.8}",
            balance.asset, balance.free, balance.locked
        );
    }
    let _ = writeln!(text, "-----------------------------");
    text
}
