use std::sync::Arc;

use tracing::{error, info, warn};

use common::{Credentials, Error, ExchangeClient, ExchangeConnector, Result};

/// One authenticated connection to the exchange, scoped to a single operation.
///
/// Created unopened; `open` connects and verifies the credentials with an
/// account query. `close` is idempotent and a no-op when `open` never
/// succeeded, so callers close unconditionally on every exit path.
pub struct Session {
    connector: Arc<dyn ExchangeConnector>,
    client: Option<Box<dyn ExchangeClient>>,
}

impl Session {
    pub fn new(connector: Arc<dyn ExchangeConnector>) -> Self {
        Self {
            connector,
            client: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Connect and run the connectivity check. Every failure is reported as
    /// a connection error; a client that fails the check is closed before
    /// this returns.
    pub async fn open(&mut self, credentials: &Credentials) -> Result<&dyn ExchangeClient> {
        if self.client.is_some() {
            return Err(Error::Connection("session is already open".into()));
        }

        let venue = if credentials.testnet {
            "Binance Spot Testnet"
        } else {
            "Binance Spot"
        };

        let mut client = self.connector.connect(credentials).await.map_err(|e| {
            error!(venue, error = %e, "Failed to connect to Binance API");
            Error::Connection(e.to_string())
        })?;

        if let Err(e) = client.get_account().await {
            error!(venue, error = %e, "Failed to connect to Binance API");
            if let Err(close_err) = client.close().await {
                warn!(error = %close_err, "Failed to release connection after failed check");
            }
            return Err(Error::Connection(e.to_string()));
        }

        info!(venue, "Successfully connected to {venue}");
        Ok(&**self.client.insert(client))
    }

    pub fn client(&self) -> Result<&dyn ExchangeClient> {
        self.client
            .as_deref()
            .ok_or_else(|| Error::Connection("session is not open".into()))
    }

    pub async fn close(&mut self) {
        let Some(mut client) = self.client.take() else {
            return;
        };
        match client.close().await {
            Ok(()) => info!("Connection closed"),
            Err(e) => warn!(error = %e, "Error while closing connection"),
        }
    }
}
