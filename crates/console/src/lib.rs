pub mod commands;
pub mod console;

pub use commands::Command;
pub use console::Console;
