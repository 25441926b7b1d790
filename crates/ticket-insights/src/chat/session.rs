use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::engine::AnswerOrchestrator;
use crate::types::TicketRecord;

pub const GREETING: &str = "Olá! Sou sua assistente de análise de dados. Posso ajudar você a \
entender melhor os dados do seu dashboard, identificar tendências e dar sugestões de melhoria. \
Como posso ajudar?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One conversation with the analysis assistant.
pub struct ChatSession {
    orchestrator: AnswerOrchestrator,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(orchestrator: AnswerOrchestrator) -> Self {
        Self {
            orchestrator,
            history: vec![ChatMessage::new(Sender::Assistant, GREETING)],
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Record the question, answer it against `records` and record the reply.
    ///
    /// Blank input is ignored and returns `None`.
    pub async fn send(&mut self, records: &[TicketRecord], text: &str) -> Option<&ChatMessage> {
        if text.trim().is_empty() {
            return None;
        }
        self.history.push(ChatMessage::new(Sender::User, text));
        let reply = self.orchestrator.answer_question(records, text).await;
        self.history.push(ChatMessage::new(Sender::Assistant, reply));
        self.history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_flow() {
        let mut session = ChatSession::new(AnswerOrchestrator::local_only());
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].text, GREETING);

        assert!(session.send(&[], "   ").await.is_none());
        assert_eq!(session.history().len(), 1);

        let records = vec![TicketRecord { status: "Aberto".into(), ..Default::default() }];
        let reply = session.send(&records, "quantos abertos?").await.unwrap();
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.text, "Chamados abertos: 1.");

        let history = session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].sender, Sender::User);
        assert_eq!(history[1].text, "quantos abertos?");
    }
}
