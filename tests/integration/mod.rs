//! Integration tests for the scoped console.
//!
//! Every test builds its own [`Console`] on the test runtime, so tests can run
//! in parallel without sharing a registry.

pub mod builtins_test;
pub mod execute_test;
pub mod loader_test;
pub mod scoping_test;

use scoped_console::config::ConsoleConfig;
use scoped_console::console::Console;

/// Creates a console with the default configuration.
pub fn console() -> Console {
    Console::new(&ConsoleConfig::default()).unwrap()
}

/// Text of the stored log lines, oldest first.
pub fn log_texts(console: &Console) -> Vec<String> {
    console
        .log()
        .lines()
        .into_iter()
        .rev()
        .map(|line| line.text)
        .collect()
}

/// Text of the most recent log line.
pub fn last_line(console: &Console) -> String {
    console
        .log()
        .lines()
        .first()
        .map(|line| line.text.clone())
        .unwrap_or_default()
}
