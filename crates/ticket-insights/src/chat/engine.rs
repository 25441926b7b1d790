//! Answer orchestration: remote model first, local engine as the guaranteed path.
//!
//! The remote call is stage one and produces a typed [`RemoteOutcome`]; stage
//! two is the pure [`select_answer`]. No remote failure reaches the caller.

use std::sync::Arc;

use crate::analytics::BucketCounts;
use crate::error::GatewayError;
use crate::llm::{analyze_tickets, GenerationConfig, LLMProvider, TicketAnalysis};
use crate::query::answer_locally;
use crate::types::TicketRecord;

/// Result of the remote stage.
#[derive(Debug)]
pub enum RemoteOutcome {
    Success(String),
    Failure(GatewayError),
}

impl From<Result<String, GatewayError>> for RemoteOutcome {
    fn from(result: Result<String, GatewayError>) -> Self {
        match result {
            Ok(text) if !text.trim().is_empty() => Self::Success(text),
            Ok(_) => Self::Failure(GatewayError::EmptyResponse),
            Err(e) => Self::Failure(e),
        }
    }
}

/// Remote text verbatim on success, otherwise the local answer.
pub fn select_answer(outcome: RemoteOutcome, records: &[TicketRecord], question: &str) -> String {
    match outcome {
        RemoteOutcome::Success(text) => text,
        RemoteOutcome::Failure(e) => {
            tracing::warn!(error = %e, "Remote answer failed, falling back to local engine");
            answer_locally(records, question)
        }
    }
}

/// Context preamble with the current status and priority breakdown.
pub fn dashboard_context(records: &[TicketRecord]) -> String {
    let counts = BucketCounts::tally(records);
    format!(
        "Contexto do Dashboard:\n\
         - Total de chamados: {}\n\
         - Chamados abertos: {}\n\
         - Chamados em andamento: {}\n\
         - Chamados fechados: {}\n\
         - Prioridade alta: {}\n\
         - Prioridade média: {}\n\
         - Prioridade baixa: {}\n\
         \n\
         Você é uma assistente especializada em análise de dados de suporte técnico. \
         Responda com base nesses dados e forneça insights úteis e sugestões práticas.",
        records.len(),
        counts.open,
        counts.in_progress,
        counts.closed,
        counts.high,
        counts.medium,
        counts.low
    )
}

/// Full prompt sent to the model for one question.
pub fn chat_prompt(context: &str, question: &str) -> String {
    format!("{}\n\nPergunta do usuário: {}", context, question)
}

/// Answers questions about a ticket snapshot.
pub struct AnswerOrchestrator {
    provider: Option<Arc<dyn LLMProvider>>,
    generation: GenerationConfig,
}

impl AnswerOrchestrator {
    pub fn new(provider: Option<Arc<dyn LLMProvider>>, generation: GenerationConfig) -> Self {
        Self { provider, generation }
    }

    /// Orchestrator that always answers locally.
    pub fn local_only() -> Self {
        Self::new(None, GenerationConfig::default())
    }

    pub fn has_remote(&self) -> bool {
        self.provider.is_some()
    }

    /// Stage one: ask the remote model.
    pub async fn ask_remote(&self, records: &[TicketRecord], question: &str) -> RemoteOutcome {
        let Some(provider) = &self.provider else {
            return RemoteOutcome::Failure(GatewayError::NotConfigured);
        };
        let prompt = chat_prompt(&dashboard_context(records), question);
        provider.generate(&prompt, &self.generation).await.into()
    }

    /// Answer `question`. Always resolves to non-empty text.
    pub async fn answer_question(&self, records: &[TicketRecord], question: &str) -> String {
        let outcome = self.ask_remote(records, question).await;
        select_answer(outcome, records, question)
    }

    /// Bulk analysis of the snapshot. Without a provider this is the uniform
    /// failure result.
    pub async fn analyze(&self, records: &[TicketRecord]) -> TicketAnalysis {
        match &self.provider {
            Some(provider) => analyze_tickets(provider.as_ref(), records, &self.generation).await,
            None => {
                tracing::warn!("Ticket analysis requested without a remote provider");
                TicketAnalysis::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderInfo;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    enum Reply {
        Text(&'static str),
        Network,
        Unsupported,
    }

    struct ScriptedProvider {
        reply: Reply,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self { reply, prompts: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn generate(&self, prompt: &str, _: &GenerationConfig) -> Result<String, GatewayError> {
            self.prompts.lock().push(prompt.to_string());
            match self.reply {
                Reply::Text(t) => Ok(t.to_string()),
                Reply::Network => Err(GatewayError::Transport {
                    endpoint: "http://remote".into(),
                    message: "connection refused".into(),
                }),
                Reply::Unsupported => Err(GatewayError::ModelUnavailable {
                    model: "gemini-pro".into(),
                    message: "NOT_FOUND".into(),
                }),
            }
        }

        fn info(&self) -> ProviderInfo {
            ProviderInfo { name: "scripted".into(), model: "test".into() }
        }
    }

    fn records() -> Vec<TicketRecord> {
        vec![
            TicketRecord {
                status: "Aberto".into(),
                priority: "Alta".into(),
                department: "Marketing".into(),
                ..Default::default()
            },
            TicketRecord { status: "Fechado".into(), priority: "Baixa".into(), ..Default::default() },
        ]
    }

    fn orchestrator(provider: Arc<ScriptedProvider>) -> AnswerOrchestrator {
        AnswerOrchestrator::new(Some(provider as Arc<dyn LLMProvider>), GenerationConfig::default())
    }

    #[tokio::test]
    async fn test_remote_text_returned_verbatim() {
        let provider = ScriptedProvider::new(Reply::Text("  Resposta do modelo\n"));
        let answer = orchestrator(provider.clone())
            .answer_question(&records(), "como estamos?")
            .await;

        assert_eq!(answer, "  Resposta do modelo\n");
        let prompts = provider.prompts.lock();
        assert!(prompts[0].starts_with("Contexto do Dashboard:\n- Total de chamados: 2\n"));
        assert!(prompts[0].ends_with("Pergunta do usuário: como estamos?"));
    }

    #[tokio::test]
    async fn test_network_error_falls_back() {
        let provider = ScriptedProvider::new(Reply::Network);
        let question = "chamados de marketing";
        let answer = orchestrator(provider).answer_question(&records(), question).await;

        assert_eq!(answer, answer_locally(&records(), question));
        assert_eq!(answer, "Marketing: 1 chamados (Abertos: 1, Em andamento: 0, Fechados: 0).");
    }

    #[tokio::test]
    async fn test_unsupported_model_and_empty_reply_fall_back() {
        for reply in [Reply::Unsupported, Reply::Text("   ")] {
            let answer = orchestrator(ScriptedProvider::new(reply))
                .answer_question(&records(), "fechados")
                .await;
            assert_eq!(answer, "Chamados fechados: 1.");
        }
    }

    #[tokio::test]
    async fn test_no_provider_answers_locally() {
        let orchestrator = AnswerOrchestrator::local_only();
        assert!(!orchestrator.has_remote());
        assert!(matches!(
            orchestrator.ask_remote(&records(), "x").await,
            RemoteOutcome::Failure(GatewayError::NotConfigured)
        ));
        let answer = orchestrator.answer_question(&[], "resumo").await;
        assert!(answer.starts_with("Resumo rápido:\n- Total: 0"));
    }

    #[tokio::test]
    async fn test_analyze_without_provider() {
        let analysis = AnswerOrchestrator::local_only().analyze(&records()).await;
        assert_eq!(analysis, TicketAnalysis::failed());
    }

    #[test]
    fn test_select_answer_is_pure_on_success() {
        let outcome = RemoteOutcome::Success("ok".into());
        assert_eq!(select_answer(outcome, &[], "q"), "ok");
    }
}
