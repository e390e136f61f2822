use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use common::{
    parse_positive, validate_symbol, LimitOrder, MarketOrder, OrderKind, OrderSide,
    StopLimitOrder, ValidationError,
};
use engine::OrderExecutor;

use crate::commands::{help_text, Command};

enum Flow {
    Continue,
    Exit,
}

/// Interactive prompt loop.
///
/// Reads one command at a time from `input`, collects order parameters with
/// re-prompting on invalid values, and runs the operation to completion
/// before prompting again. End of input behaves like `quit`.
pub struct Console<R, W> {
    input: R,
    out: W,
    executor: OrderExecutor,
    log_file: String,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(input: R, out: W, executor: OrderExecutor, log_file: impl Into<String>) -> Self {
        Self {
            input,
            out,
            executor,
            log_file: log_file.into(),
        }
    }

    /// Give back the output sink (used to inspect what was printed).
    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn run(&mut self) -> io::Result<()> {
        writeln!(self.out, "--- Simplified Trading Bot CLI ---")?;
        write!(self.out, "{}", help_text())?;

        loop {
            let Some(line) = self.prompt("\nEnter command: ").await? else {
                info!("Console input closed");
                writeln!(self.out, "\nExiting bot.")?;
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let Some(cmd) = Command::parse(&line) else {
                writeln!(
                    self.out,
                    "Unknown command '{}'. Type 'help' to list commands.",
                    line.trim()
                )?;
                continue;
            };

            debug!(command = cmd.name(), "Dispatching console command");
            if let Flow::Exit = self.dispatch(cmd).await? {
                break;
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, cmd: Command) -> io::Result<Flow> {
        match cmd {
            Command::Quit => {
                writeln!(self.out, "Exiting bot.")?;
                Ok(Flow::Exit)
            }
            Command::Help => {
                write!(self.out, "{}", help_text())?;
                Ok(Flow::Continue)
            }
            Command::AccountInfo => {
                if self.executor.display_account_info(&mut self.out).await.is_none() {
                    writeln!(
                        self.out,
                        "Could not fetch account info. See {} for details.",
                        self.log_file
                    )?;
                }
                Ok(Flow::Continue)
            }
            Command::Market => self.order(OrderKind::Market).await,
            Command::Limit => self.order(OrderKind::Limit).await,
            Command::StopLimit => self.order(OrderKind::StopLimit).await,
        }
    }

    async fn order(&mut self, kind: OrderKind) -> io::Result<Flow> {
        let Some(symbol) = self.read_symbol().await? else {
            return Ok(Flow::Exit);
        };
        let Some(side) = self.read_side().await? else {
            return Ok(Flow::Exit);
        };
        let Some(quantity) = self.read_positive("Enter quantity: ", "quantity").await? else {
            return Ok(Flow::Exit);
        };
        let price = if matches!(kind, OrderKind::Limit | OrderKind::StopLimit) {
            let Some(price) = self.read_positive("Enter limit price: ", "price").await? else {
                return Ok(Flow::Exit);
            };
            price
        } else {
            0.0
        };

        let placed = match kind {
            OrderKind::Market => match MarketOrder::new(&symbol, side, quantity) {
                Ok(order) => self
                    .executor
                    .place_market_order(&mut self.out, &order)
                    .await
                    .is_some(),
                Err(e) => return self.invalid(e),
            },
            OrderKind::Limit => match LimitOrder::new(&symbol, side, quantity, price) {
                Ok(order) => self
                    .executor
                    .place_limit_order(&mut self.out, &order)
                    .await
                    .is_some(),
                Err(e) => return self.invalid(e),
            },
            OrderKind::StopLimit => {
                let Some(stop_price) = self
                    .read_positive("Enter stop price: ", "stop price")
                    .await?
                else {
                    return Ok(Flow::Exit);
                };
                match StopLimitOrder::new(&symbol, side, quantity, price, stop_price) {
                    Ok(order) => self
                        .executor
                        .place_stop_limit_order(&mut self.out, &order)
                        .await
                        .is_some(),
                    Err(e) => return self.invalid(e),
                }
            }
        };

        if !placed {
            writeln!(
                self.out,
                "Order was not placed. See {} for details.",
                self.log_file
            )?;
        }
        Ok(Flow::Continue)
    }

    fn invalid(&mut self, err: ValidationError) -> io::Result<Flow> {
        writeln!(self.out, "Invalid order: {err}")?;
        Ok(Flow::Continue)
    }

    async fn read_symbol(&mut self) -> io::Result<Option<String>> {
        loop {
            let Some(line) = self.prompt("Enter symbol (e.g., BTCUSDT): ").await? else {
                return Ok(None);
            };
            match validate_symbol(&line.to_uppercase()) {
                Ok(symbol) => return Ok(Some(symbol)),
                Err(_) => writeln!(self.out, "Symbol cannot be empty.")?,
            }
        }
    }

    async fn read_side(&mut self) -> io::Result<Option<OrderSide>> {
        loop {
            let Some(line) = self.prompt("Enter side (BUY/SELL): ").await? else {
                return Ok(None);
            };
            match line.trim().to_uppercase().parse::<OrderSide>() {
                Ok(side) => return Ok(Some(side)),
                Err(_) => writeln!(self.out, "Invalid side. Please enter 'buy' or 'sell'.")?,
            }
        }
    }

    async fn read_positive(
        &mut self,
        prompt: &str,
        field: &'static str,
    ) -> io::Result<Option<f64>> {
        loop {
            let Some(line) = self.prompt(prompt).await? else {
                return Ok(None);
            };
            match parse_positive(field, &line) {
                Ok(value) => return Ok(Some(value)),
                Err(ValidationError::NotPositive { .. }) => writeln!(
                    self.out,
                    "Invalid {field}. Please enter a number greater than zero."
                )?,
                Err(_) => writeln!(self.out, "Invalid {field}. Please enter a number.")?,
            }
        }
    }

    /// `None` at end of input. Lines that are not valid UTF-8 are re-prompted.
    async fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        loop {
            write!(self.out, "{text}")?;
            self.out.flush()?;

            let mut raw = Vec::new();
            if self.input.read_until(b'\n', &mut raw).await? == 0 {
                return Ok(None);
            }
            match String::from_utf8(raw) {
                Ok(line) => return Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
                Err(e) => {
                    debug!(error = %e, "Discarding console line that is not valid UTF-8");
                    writeln!(self.out, "Input was not valid text. Please try again.")?;
                }
            }
        }
    }
}
