use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;
use url::Url;

use common::{
    AccountInfo, Balance, Credentials, Error, ExchangeClient, ExchangeConnector, LimitOrder,
    MarketOrder, OrderReceipt, OrderSide, Result, StopLimitOrder,
};

/// Spot testnet REST endpoint.
pub const TESTNET_BASE_URL: &str = "https://testnet.binance.vision";

const ACCOUNT_PATH: &str = "/api/v3/account";
const ORDER_PATH: &str = "/api/v3/order";

/// Hands out one `BinanceClient` per session.
pub struct BinanceConnector {
    recv_window_ms: u64,
}

impl BinanceConnector {
    pub fn new(recv_window_ms: u64) -> Self {
        Self { recv_window_ms }
    }
}

#[async_trait]
impl ExchangeConnector for BinanceConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn ExchangeClient>> {
        let client = BinanceClient::new(credentials, self.recv_window_ms)?;
        debug!(
            base_url = %credentials.base_url,
            testnet = credentials.testnet,
            "Binance HTTP client created"
        );
        Ok(Box::new(client))
    }
}

/// REST API client for Binance Spot. Used for order placement and account queries.
pub struct BinanceClient {
    api_key: String,
    secret: String,
    base_url: Url,
    recv_window_ms: u64,
    /// `None` once closed.
    http: Option<Client>,
}

impl BinanceClient {
    pub fn new(credentials: &Credentials, recv_window_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: credentials.api_key.clone(),
            secret: credentials.secret_key.clone(),
            base_url: credentials.base_url.clone(),
            recv_window_ms,
            http: Some(http),
        })
    }

    fn http(&self) -> Result<&Client> {
        self.http
            .as_ref()
            .ok_or_else(|| Error::Connection("connection already closed".into()))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("cannot build URL for {path}: {e}")))
    }

    /// Encode `params`, append `recvWindow` and `timestamp`, and sign the result.
    fn signed_query(&self, params: &[(&str, String)]) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            query.append_pair(key, value);
        }
        query.append_pair("recvWindow", &self.recv_window_ms.to_string());
        query.append_pair("timestamp", &Utc::now().timestamp_millis().to_string());
        let query = query.finish();

        let signature = sign_query(&self.secret, &query);
        format!("{query}&signature={signature}")
    }

    async fn signed_get(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let mut url = self.endpoint(path)?;
        url.set_query(Some(&self.signed_query(params)));

        let resp = self
            .http()?
            .get(url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        read_body(resp).await
    }

    async fn signed_post(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let url = self.endpoint(path)?;
        let body = self.signed_query(params);

        let resp = self
            .http()?
            .post(url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        read_body(resp).await
    }

    async fn submit_order(&self, params: &[(&str, String)]) -> Result<OrderReceipt> {
        let body = self.signed_post(ORDER_PATH, params).await?;
        let resp: OrderResponse =
            serde_json::from_str(&body).map_err(|e| Error::Exchange(e.to_string()))?;
        Ok(resp.into())
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn get_account(&self) -> Result<AccountInfo> {
        let body = self.signed_get(ACCOUNT_PATH, &[]).await?;
        let account: AccountResponse =
            serde_json::from_str(&body).map_err(|e| Error::Exchange(e.to_string()))?;
        account.try_into()
    }

    async fn place_market_order(&self, order: &MarketOrder) -> Result<OrderReceipt> {
        debug!(symbol = %order.symbol, side = %order.side, "Submitting market order to Binance");
        self.submit_order(&market_order_params(order)).await
    }

    async fn place_limit_order(&self, order: &LimitOrder) -> Result<OrderReceipt> {
        debug!(symbol = %order.symbol, side = %order.side, "Submitting limit order to Binance");
        self.submit_order(&limit_order_params(order)).await
    }

    async fn place_stop_limit_order(&self, order: &StopLimitOrder) -> Result<OrderReceipt> {
        debug!(symbol = %order.symbol, side = %order.side, "Submitting stop-limit order to Binance");
        let mut receipt = self.submit_order(&stop_limit_order_params(order)).await?;
        // RESULT responses may omit stopPrice; echo what was requested.
        receipt
            .stop_price
            .get_or_insert_with(|| order.stop_price.to_string());
        Ok(receipt)
    }

    async fn close(&mut self) -> Result<()> {
        if self.http.take().is_some() {
            debug!("Binance HTTP client released");
        }
        Ok(())
    }
}

/// HMAC-SHA256 of `query` keyed by the API secret, hex encoded.
pub fn sign_query(secret: &str, query: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn base_order_params(
    client_order_id: &str,
    symbol: &str,
    side: OrderSide,
    order_type: &str,
    quantity: f64,
) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", symbol.to_string()),
        ("side", side.to_string()),
        ("type", order_type.to_string()),
        ("quantity", quantity.to_string()),
        ("newClientOrderId", client_order_id.to_string()),
        ("newOrderRespType", "RESULT".to_string()),
    ]
}

fn market_order_params(order: &MarketOrder) -> Vec<(&'static str, String)> {
    base_order_params(
        &order.client_order_id,
        &order.symbol,
        order.side,
        "MARKET",
        order.quantity,
    )
}

fn limit_order_params(order: &LimitOrder) -> Vec<(&'static str, String)> {
    let mut params = base_order_params(
        &order.client_order_id,
        &order.symbol,
        order.side,
        "LIMIT",
        order.quantity,
    );
    params.push(("timeInForce", "GTC".to_string()));
    params.push(("price", order.price.to_string()));
    params
}

fn stop_limit_order_params(order: &StopLimitOrder) -> Vec<(&'static str, String)> {
    let mut params = base_order_params(
        &order.client_order_id,
        &order.symbol,
        order.side,
        "STOP_LOSS_LIMIT",
        order.quantity,
    );
    params.push(("timeInForce", "GTC".to_string()));
    params.push(("price", order.price.to_string()));
    params.push(("stopPrice", order.stop_price.to_string()));
    params
}

async fn read_body(resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

    if !status.is_success() {
        return Err(rejection(status, &body));
    }
    Ok(body)
}

/// Binance reports failures as `{"code": -1121, "msg": "Invalid symbol."}`.
fn rejection(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => Error::ExchangeRejection {
            code: err.code,
            msg: err.msg,
        },
        Err(_) => Error::Exchange(format!("HTTP {status}: {body}")),
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    symbol: String,
    order_id: u64,
    client_order_id: String,
    transact_time: Option<i64>,
    #[serde(default)]
    price: String,
    #[serde(default)]
    orig_qty: String,
    #[serde(default)]
    executed_qty: String,
    status: String,
    #[serde(rename = "type")]
    order_type: String,
    side: OrderSide,
    stop_price: Option<String>,
}

impl From<OrderResponse> for OrderReceipt {
    fn from(resp: OrderResponse) -> Self {
        OrderReceipt {
            symbol: resp.symbol,
            order_id: resp.order_id,
            client_order_id: resp.client_order_id,
            side: resp.side,
            order_type: resp.order_type,
            status: resp.status,
            price: resp.price,
            stop_price: resp.stop_price,
            orig_qty: resp.orig_qty,
            executed_qty: resp.executed_qty,
            transact_time: resp.transact_time.and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    #[serde(default)]
    can_trade: bool,
    balances: Vec<BalanceResponse>,
}

#[derive(Deserialize)]
struct BalanceResponse {
    asset: String,
    free: String,
    locked: String,
}

impl TryFrom<AccountResponse> for AccountInfo {
    type Error = Error;

    fn try_from(resp: AccountResponse) -> Result<Self> {
        let balances = resp
            .balances
            .into_iter()
            .map(|b| -> Result<Balance> {
                let free = parse_amount(&b.asset, "free", &b.free)?;
                let locked = parse_amount(&b.asset, "locked", &b.locked)?;
                Ok(Balance {
                    asset: b.asset,
                    free,
                    locked,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AccountInfo {
            can_trade: resp.can_trade,
            balances,
        })
    }
}

fn parse_amount(asset: &str, field: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::Exchange(format!("{asset} {field} balance '{raw}': {e}")))
}
