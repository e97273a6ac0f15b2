use serde::{Deserialize, Serialize};
use std::fmt;

/// One message in a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum ConversationTurn {
    /// Question typed by the user.
    Human(String),
    /// Natural-language answer produced by the model.
    Ai(String),
}

impl ConversationTurn {
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human(content.into())
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::Ai(content.into())
    }

    pub fn content(&self) -> &str {
        match self {
            ConversationTurn::Human(text) | ConversationTurn::Ai(text) => text,
        }
    }

    /// Speaker label used when the turn is rendered into a prompt.
    pub fn speaker(&self) -> &'static str {
        match self {
            ConversationTurn::Human(_) => "Human",
            ConversationTurn::Ai(_) => "AI",
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, ConversationTurn::Human(_))
    }
}

impl fmt::Display for ConversationTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker(), self.content())
    }
}

/// Append-only, ordered list of turns.
///
/// Turns cannot be edited or removed once pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a ConversationTurn;
    type IntoIter = std::slice::Iter<'a, ConversationTurn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
