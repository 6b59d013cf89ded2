use chrono::{ DateTime, Utc };

pub const WELCOME_TEXT: &str = "お兄ちゃん、こんにちは！今日はどんなことをお手伝いしましょうか？";
pub const TYPING_TEXT: &str = "紗良が入力中...";
pub const CHAT_FALLBACK_TEXT: &str =
    "お兄ちゃん、ごめんね...今ちょっと調子が悪いみたい。少し待ってもらえる？";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Transient "reply pending" entry, never sent or persisted.
    Typing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn typing() -> Self {
        Self::new(Role::Typing, TYPING_TEXT)
    }

    pub fn welcome() -> Self {
        Self::assistant(WELCOME_TEXT)
    }

    pub fn is_typing(&self) -> bool {
        self.role == Role::Typing
    }
}
