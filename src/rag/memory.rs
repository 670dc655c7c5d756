use serde::{Deserialize, Serialize};

const HUMAN_PREFIX: &str = "Human";
const AI_PREFIX: &str = "AI";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Unbounded buffer of question/answer turns.
#[derive(Debug, Default, Clone)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// History rendered as alternating `Human:` / `AI:` lines.
    pub fn buffer(&self) -> String {
        self.turns
            .iter()
            .map(|turn| {
                format!(
                    "{}: {}\n{}: {}",
                    HUMAN_PREFIX, turn.question, AI_PREFIX, turn.answer
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
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

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
