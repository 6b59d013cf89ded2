use chrono::{ DateTime, Local, Utc };
use log::warn;
use std::io::{ self, Write };
use std::sync::{ Mutex, MutexGuard };

use crate::models::chat::{ Message, Role };

/// Read-only snapshot handed to a renderer after every session mutation.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    pub messages: &'a [Message],
    pub open: bool,
    pub awaiting_reply: bool,
}

pub trait Renderer: Send + Sync {
    fn render(&self, view: &SessionView<'_>);

    fn scroll_to_bottom(&self) {}
}

/// Renderer for headless hosts and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&self, _view: &SessionView<'_>) {}
}

/// Hour:minute in local time, zero padded.
pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

pub fn format_line(message: &Message) -> String {
    match message.role {
        Role::User => format!("[{}] you: {}", format_time(&message.timestamp), message.content),
        Role::Assistant =>
            format!("[{}] 紗良: {}", format_time(&message.timestamp), message.content),
        Role::Typing => format!("        {}", message.content),
    }
}

/// Prints new messages to stdout as they arrive.
///
/// Only outputs while the chat is open. If the list no longer starts with
/// what was already printed (a history load replaced it) everything is
/// printed again. The typing line is printed once per pending reply.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    state: Mutex<PrintState>,
}

#[derive(Debug, Default)]
struct PrintState {
    printed: Vec<Message>,
    typing_shown: bool,
}

impl PrintState {
    /// Lines to write for `view`; records them as printed.
    fn advance(&mut self, view: &SessionView<'_>) -> Vec<String> {
        let visible: Vec<&Message> = view.messages
            .iter()
            .filter(|m| !m.is_typing())
            .collect();
        let start = unprinted_from(&self.printed, &visible);
        let mut lines: Vec<String> = visible[start..]
            .iter()
            .map(|m| format_line(m))
            .collect();

        let typing = view.messages.iter().find(|m| m.is_typing());
        if let Some(typing) = typing {
            if !self.typing_shown || start == 0 {
                lines.push(format_line(typing));
            }
        }
        self.typing_shown = typing.is_some();
        self.printed = visible.into_iter().cloned().collect();
        lines
    }

    fn reset(&mut self) {
        self.printed.clear();
        self.typing_shown = false;
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, PrintState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_lines(lines: &[String]) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()
    }
}

impl Renderer for TerminalRenderer {
    fn render(&self, view: &SessionView<'_>) {
        if !view.open {
            return;
        }
        let lines = self.lock_state().advance(view);
        if lines.is_empty() {
            return;
        }
        if let Err(e) = Self::write_lines(&lines) {
            warn!("Failed to write chat output: {}", e);
        }
    }

    fn scroll_to_bottom(&self) {
        // Forget what was printed so the next render shows the whole chat.
        self.lock_state().reset();
    }
}

/// Index of the first message in `visible` that still needs printing.
fn unprinted_from(printed: &[Message], visible: &[&Message]) -> usize {
    let is_prefix = printed.len() <= visible.len() &&
        printed.iter().zip(visible).all(|(a, b)| a == *b);
    if is_prefix { printed.len() } else { 0 }
}
