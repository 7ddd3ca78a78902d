//! Conversation sessions and their storage boundary
//!
//! A [`Session`] is the persisted record of one conversation: its serialized
//! message history (system message excluded), dialogue counters, and ownership.
//! Storage and per-user permission enforcement live behind the
//! [`SessionStore`] trait; [`FsSessionStore`] is the bundled JSON-file
//! implementation.

mod persistence;

pub use persistence::{FsSessionStore, sessions_dir};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::error::Result;

/// Maximum length of a derived session title
const MAX_TITLE_LEN: usize = 60;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Archived,
}

/// Persisted record of one conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub title: String,
    pub status: SessionStatus,
    /// Serialized message history, system message excluded
    pub messages: String,
    /// Number of user and assistant messages only
    pub message_count: usize,
    pub model_used: Option<String>,
    pub owner: String,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create an empty session owned by `owner`
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            title: String::new(),
            status: SessionStatus::Active,
            messages: String::new(),
            message_count: 0,
            model_used: None,
            owner: owner.into(),
            last_message_at: None,
        }
    }

    /// Refresh derived fields before a save: dialogue counter, timestamp, and
    /// a title for sessions that never got one.
    ///
    /// Unparseable message history leaves the counters untouched.
    pub fn refresh_before_save(&mut self) {
        if let Ok(conversation) = Conversation::from_stored(&self.messages) {
            self.message_count = conversation.dialogue_len();
            if self.title.is_empty()
                && let Some(first) = conversation.first_user_content()
            {
                self.title = derive_title(first);
            }
        }
        self.last_message_at = Some(Utc::now());
    }
}

/// Single-line title derived from the opening user message
fn derive_title(content: &str) -> String {
    let line = content.lines().next().unwrap_or("").trim();
    if line.chars().count() <= MAX_TITLE_LEN {
        line.to_string()
    } else {
        let cut: String = line.chars().take(MAX_TITLE_LEN - 3).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Storage collaborator for sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session by id; `None` when it does not exist
    async fn load(&self, session_id: &str) -> Result<Option<Session>>;

    /// Persist a session
    async fn save(&self, session: &Session) -> Result<()>;

    /// Whether `user` may read or write this session
    fn can_access(&self, session: &Session, user: &str) -> bool {
        session.owner == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Message};

    #[test]
    fn test_new_session_is_empty_and_active() {
        let session = Session::new("alice@example.com");
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.message_count, 0);
        assert!(session.title.is_empty());
        assert!(session.last_message_at.is_none());
    }

    #[test]
    fn test_refresh_counts_dialogue_messages() {
        let mut conv = Conversation::new();
        conv.push(Message::user("show open invoices"));
        conv.push(Message::tool_result("call-1", "get_sales_invoices", "[]"));
        conv.push(Message::assistant("You have none."));

        let mut session = Session::new("alice@example.com");
        session.messages = conv.to_stored().unwrap();
        session.refresh_before_save();

        assert_eq!(session.message_count, 2);
        assert_eq!(session.title, "show open invoices");
        assert!(session.last_message_at.is_some());
    }

    #[test]
    fn test_refresh_keeps_existing_title() {
        let mut conv = Conversation::new();
        conv.push(Message::user("hello"));

        let mut session = Session::new("alice@example.com");
        session.title = "My session".to_string();
        session.messages = conv.to_stored().unwrap();
        session.refresh_before_save();

        assert_eq!(session.title, "My session");
    }

    #[test]
    fn test_refresh_tolerates_garbage_history() {
        let mut session = Session::new("alice@example.com");
        session.messages = "not json".to_string();
        session.message_count = 7;
        session.refresh_before_save();

        assert_eq!(session.message_count, 7);
        assert!(session.last_message_at.is_some());
    }

    #[test]
    fn test_derive_title_truncates() {
        let long = "word ".repeat(40);
        let title = derive_title(&long);
        assert!(title.chars().count() <= MAX_TITLE_LEN);
        assert!(title.ends_with("..."));
    }
}
