pub mod controller;

use log::debug;

use crate::models::api::HistoryEntry;
use crate::models::chat::{ Message, CHAT_FALLBACK_TEXT };
use crate::render::SessionView;

pub use controller::{ SessionController, SessionOptions };

/// Number of trailing server history entries restored on load.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty or whitespace only.
    Empty,
    /// A reply is still pending; the send was ignored.
    Busy,
    Replied,
    Fallback,
}

/// In-memory state of one chat widget.
///
/// The list keeps insertion order. Index 0 is always the welcome message
/// the session was created with.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
    open: bool,
    awaiting_reply: bool,
    input: String,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_seed(Message::welcome())
    }

    pub fn with_seed(seed: Message) -> Self {
        Self {
            messages: vec![seed],
            open: false,
            awaiting_reply: false,
            input: String::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            messages: &self.messages,
            open: self.open,
            awaiting_reply: self.awaiting_reply,
        }
    }

    /// Flips the open flag and returns the new value.
    pub fn toggle_open(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    /// First half of a send: records the user message and the typing
    /// placeholder. Returns `Err(outcome)` when nothing should be sent.
    pub fn begin_send(&mut self, text: &str) -> Result<(), SendOutcome> {
        if text.trim().is_empty() {
            return Err(SendOutcome::Empty);
        }
        if self.awaiting_reply {
            debug!("Ignoring send while a reply is pending");
            return Err(SendOutcome::Busy);
        }
        self.messages.push(Message::user(text));
        self.input.clear();
        self.awaiting_reply = true;
        self.messages.push(Message::typing());
        Ok(())
    }

    /// Second half of a send: swaps the placeholder for the reply, or for
    /// the fixed apology when the backend call failed.
    pub fn finish_send(&mut self, reply: Option<String>) -> SendOutcome {
        self.clear_typing();
        self.awaiting_reply = false;
        match reply {
            Some(text) => {
                self.messages.push(Message::assistant(text));
                SendOutcome::Replied
            }
            None => {
                self.messages.push(Message::assistant(CHAT_FALLBACK_TEXT));
                SendOutcome::Fallback
            }
        }
    }

    /// Replaces the list with the seed followed by the last
    /// [`HISTORY_WINDOW`] entries. An empty history changes nothing.
    pub fn apply_history(&mut self, history: Vec<HistoryEntry>) -> bool {
        if history.is_empty() {
            return false;
        }
        let seed = self.messages.first().cloned().unwrap_or_else(Message::welcome);
        let skip = history.len().saturating_sub(HISTORY_WINDOW);
        let mut messages = Vec::with_capacity(1 + history.len() - skip);
        messages.push(seed);
        messages.extend(history.into_iter().skip(skip).map(HistoryEntry::into_message));
        self.messages = messages;
        true
    }

    pub fn receive_push(&mut self, message: impl Into<String>) {
        self.messages.push(Message::assistant(message));
    }

    fn clear_typing(&mut self) {
        self.messages.retain(|m| !m.is_typing());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api::HistoryTimestamp;
    use crate::models::chat::{ Role, WELCOME_TEXT };

    fn entries(n: usize) -> Vec<HistoryEntry> {
        (0..n)
            .map(|i| HistoryEntry {
                role: if i % 2 == 0 { "user".into() } else { "assistant".into() },
                content: format!("m{}", i),
                timestamp: Some(HistoryTimestamp::Millis(1_700_000_000_000.0 + i as f64)),
            })
            .collect()
    }

    #[test]
    fn new_session_is_seeded_and_closed() {
        let session = ChatSession::new();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, WELCOME_TEXT);
        assert!(!session.is_open());
        assert!(!session.awaiting_reply());
    }

    #[test]
    fn blank_input_is_a_no_op() {
        let mut session = ChatSession::new();
        session.set_input("   ");
        assert_eq!(session.begin_send("   \t\n"), Err(SendOutcome::Empty));
        assert_eq!(session.begin_send(""), Err(SendOutcome::Empty));
        assert_eq!(session.messages().len(), 1);
        assert!(!session.awaiting_reply());
        assert_eq!(session.input(), "   ");
    }

    #[test]
    fn begin_send_adds_user_message_and_placeholder() {
        let mut session = ChatSession::new();
        session.set_input("hello");
        session.begin_send("hello").unwrap();

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Typing]);
        assert!(session.awaiting_reply());
        assert_eq!(session.input(), "");
    }

    #[test]
    fn second_send_while_waiting_is_ignored() {
        let mut session = ChatSession::new();
        session.begin_send("one").unwrap();
        session.set_input("two");
        assert_eq!(session.begin_send("two"), Err(SendOutcome::Busy));
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.input(), "two");
    }

    #[test]
    fn finish_send_replaces_placeholder() {
        let mut session = ChatSession::new();
        session.begin_send("hello").unwrap();
        assert_eq!(session.finish_send(Some("hi there".into())), SendOutcome::Replied);

        let tail: Vec<(Role, &str)> = session.messages()[1..]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(tail, vec![(Role::User, "hello"), (Role::Assistant, "hi there")]);
        assert!(!session.awaiting_reply());
    }

    #[test]
    fn failed_send_appends_fallback() {
        let mut session = ChatSession::new();
        session.begin_send("hello").unwrap();
        assert_eq!(session.finish_send(None), SendOutcome::Fallback);

        let last = session.messages().last().unwrap();
        assert_eq!(last.content, CHAT_FALLBACK_TEXT);
        assert!(session.messages().iter().all(|m| !m.is_typing()));
        assert!(!session.awaiting_reply());
    }

    #[test]
    fn history_keeps_seed_and_last_ten() {
        let mut session = ChatSession::new();
        session.begin_send("early").unwrap();
        session.finish_send(Some("early reply".into()));

        assert!(session.apply_history(entries(15)));

        let contents: Vec<&str> = session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents.len(), 11);
        assert_eq!(contents[0], WELCOME_TEXT);
        let expected: Vec<String> = (5..15).map(|i| format!("m{}", i)).collect();
        assert_eq!(&contents[1..], expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn short_history_is_taken_whole() {
        let mut session = ChatSession::new();
        assert!(session.apply_history(entries(3)));
        assert_eq!(session.messages().len(), 4);
        assert_eq!(session.messages()[1].role, Role::User);
        assert_eq!(session.messages()[2].role, Role::Assistant);
    }

    #[test]
    fn empty_history_changes_nothing() {
        let mut session = ChatSession::new();
        assert!(!session.apply_history(Vec::new()));
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn push_appends_even_while_waiting() {
        let mut session = ChatSession::new();
        session.begin_send("hello").unwrap();
        session.receive_push("pushed");
        assert_eq!(session.messages().last().unwrap().content, "pushed");
        assert!(session.awaiting_reply());

        session.finish_send(Some("reply".into()));
        let contents: Vec<&str> = session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(&contents[1..], ["hello", "pushed", "reply"]);
    }

    #[test]
    fn toggle_flips_open() {
        let mut session = ChatSession::new();
        assert!(session.toggle_open());
        assert!(!session.toggle_open());
    }
}
