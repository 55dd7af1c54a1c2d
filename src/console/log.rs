//! The visible console log.
//!
//! Lines are stored newest first and capped at a configurable length. A line
//! may carry a color, rendered as `<color=#RRGGBB>text</color>` markup in the
//! full text view.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::value::Color;

/// Color of error messages.
pub const ERROR_COLOR: Color = Color::rgb(0xFF, 0x51, 0x2F);

/// Color of highlighted text such as command usage.
pub const HIGHLIGHT_COLOR: Color = Color::rgb(0xFF, 0xFC, 0xD1);

/// A single log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub color: Option<Color>,
}

impl LogLine {
    /// The line with its color markup applied.
    pub fn markup(&self) -> String {
        match self.color {
            Some(color) => format!("<color=#{}>{}</color>", color.to_hex(), self.text),
            None => self.text.clone(),
        }
    }
}

type Listener = Arc<dyn Fn(&str) + Send + Sync>;

struct LogState {
    /// Newest first.
    lines: VecDeque<LogLine>,
    /// Total lines ever appended.
    appended: u64,
}

/// Bounded, thread-safe store of console output.
pub struct ConsoleLog {
    state: Mutex<LogState>,
    listeners: Mutex<Vec<Listener>>,
    max_lines: usize,
}

impl ConsoleLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            state: Mutex::new(LogState {
                lines: VecDeque::new(),
                appended: 0,
            }),
            listeners: Mutex::new(Vec::new()),
            max_lines: max_lines.max(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends uncolored text, one line per `\n`.
    pub fn log(&self, text: impl AsRef<str>) {
        self.append(text.as_ref(), None);
    }

    pub fn log_colored(&self, text: impl AsRef<str>, color: Color) {
        self.append(text.as_ref(), Some(color));
    }

    /// Appends text in the error color.
    pub fn error(&self, text: impl AsRef<str>) {
        self.append(text.as_ref(), Some(ERROR_COLOR));
    }

    fn append(&self, text: &str, color: Option<Color>) {
        {
            let mut state = self.state();
            for line in text.split('\n') {
                state.lines.push_front(LogLine {
                    text: line.to_string(),
                    color,
                });
                state.appended += 1;
            }
            state.lines.truncate(self.max_lines);
        }
        self.notify();
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if listeners.is_empty() {
            return;
        }
        let text = self.text();
        for listener in listeners {
            listener(&text);
        }
    }

    /// Registers a callback receiving the full text after every change.
    pub fn subscribe(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Every stored line, newest first.
    pub fn lines(&self) -> Vec<LogLine> {
        self.state().lines.iter().cloned().collect()
    }

    /// The stored lines oldest first, with color markup, joined by `\n`.
    pub fn text(&self) -> String {
        let state = self.state();
        let lines: Vec<String> = state.lines.iter().rev().map(LogLine::markup).collect();
        lines.join("\n")
    }

    /// Total number of lines appended so far, including evicted ones.
    pub fn cursor(&self) -> u64 {
        self.state().appended
    }

    /// Lines appended after `cursor` that are still stored, oldest first,
    /// along with the new cursor.
    pub fn lines_since(&self, cursor: u64) -> (Vec<LogLine>, u64) {
        let state = self.state();
        let fresh = state.appended.saturating_sub(cursor);
        let available = usize::try_from(fresh)
            .unwrap_or(usize::MAX)
            .min(state.lines.len());
        let lines = state.lines.iter().take(available).rev().cloned().collect();
        (lines, state.appended)
    }

    pub fn len(&self) -> usize {
        self.state().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().lines.is_empty()
    }

    pub fn clear(&self) {
        self.state().lines.clear();
        self.notify();
    }
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new(300)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_lines_are_newest_first() {
        let log = ConsoleLog::new(10);
        log.log("one");
        log.log("two\nthree");
        let texts: Vec<String> = log.lines().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["three", "two", "one"]);
        assert_eq!(log.text(), "one\ntwo\nthree");
    }

    #[test]
    fn test_bounded_length() {
        let log = ConsoleLog::new(2);
        log.log("a");
        log.log("b");
        log.log("c");
        assert_eq!(log.len(), 2);
        assert_eq!(log.text(), "b\nc");
    }

    #[test]
    fn test_error_markup() {
        let log = ConsoleLog::new(10);
        log.error("bad");
        assert_eq!(log.text(), "<color=#FF512F>bad</color>");
        assert_eq!(log.lines()[0].color, Some(ERROR_COLOR));
    }

    #[test]
    fn test_lines_since_cursor() {
        let log = ConsoleLog::new(10);
        log.log("old");
        let cursor = log.cursor();
        log.log("new\nnewer");
        let (lines, next) = log.lines_since(cursor);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["new", "newer"]);
        assert_eq!(next, 3);
        assert!(log.lines_since(next).0.is_empty());
    }

    #[test]
    fn test_listeners_receive_full_text() {
        let log = ConsoleLog::new(10);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        log.subscribe(move |text| {
            assert!(text.ends_with("hello"));
            seen.fetch_add(1, Ordering::SeqCst);
        });
        log.log("hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
