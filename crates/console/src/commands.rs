/// Commands accepted at the top-level prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Market,
    Limit,
    StopLimit,
    AccountInfo,
    Help,
    Quit,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Market,
        Command::Limit,
        Command::StopLimit,
        Command::AccountInfo,
        Command::Help,
        Command::Quit,
    ];

    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.name() == token)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Market => "market",
            Command::Limit => "limit",
            Command::StopLimit => "stop_limit",
            Command::AccountInfo => "account_info",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Market => "place a market order",
            Command::Limit => "place a good-till-cancelled limit order",
            Command::StopLimit => "place a stop-limit order",
            Command::AccountInfo => "show non-zero spot balances",
            Command::Help => "show this list",
            Command::Quit => "exit",
        }
    }
}

/// Multi-line command list shown at startup and by `help`.
pub fn help_text() -> String {
    let mut text = String::from("Commands:\n");
    for cmd in Command::ALL {
        text.push_str(&format!("  {:<13} {}\n", cmd.name(), cmd.description()));
    }
    text
}
