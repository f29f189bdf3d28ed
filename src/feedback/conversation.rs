use crate::feedback::types::FeedbackError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content of a chat turn: plain text or an attached file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    File { path: String },
}

/// One message in a chat history, with the user's like-label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: TurnContent,
    #[serde(default)]
    pub liked: bool,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: TurnContent::Text(text.into()),
            liked: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: TurnContent::Text(text.into()),
            liked: false,
        }
    }

    pub fn attachment(path: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: TurnContent::File { path: path.into() },
            liked: false,
        }
    }
}

/// Label the turn at `index` as liked; earlier labels are kept
pub fn mark_liked(history: &mut [ChatTurn], index: usize) -> Result<(), FeedbackError> {
    let len = history.len();
    let turn = history.get_mut(index).ok_or_else(|| {
        FeedbackError::Validation(format!("liked index {index} out of range for {len} turns"))
    })?;
    turn.liked = true;
    Ok(())
}

/// A submitted conversation, ready to hand to `FeedbackRecorder::append`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation: Vec<ChatTurn>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(conversation: Vec<ChatTurn>) -> Self {
        Self {
            conversation,
            timestamp: Utc::now(),
        }
    }

    pub fn liked_count(&self) -> usize {
        self.conversation.iter().filter(|t| t.liked).count()
    }
}
