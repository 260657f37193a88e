use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    Physics,
    General,
}

impl Subject {
    /// Label prefixed to every routed reply.
    pub fn label(self) -> &'static str {
        match self {
            Self::Math => "Mathematics Help",
            Self::Physics => "Physics Help",
            Self::General => "General Response",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantRecord {
    pub value: f64,
    pub unit: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub session_id: Option<String>,
    pub text: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationLine {
    pub expression: String,
    pub rendered: String,
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorReply {
    pub reply_text: String,
    pub subject: Subject,
    pub calculations: Vec<CalculationLine>,
    pub constants_cited: Vec<String>,
    pub json_payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub at: DateTime<Utc>,
    pub user_text: String,
    pub assistant_text: String,
    pub subject: Subject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub user_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
}
