//! Bulk ticket analysis: prompt construction and section parsing of the reply.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::{GenerationConfig, LLMProvider};
use crate::analytics::{count_by_field, priority_counts, status_counts, BucketCounts};
use crate::types::{TicketField, TicketRecord};

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[•\-*]\s*").expect("bullet regex is valid"));

pub const NO_SUMMARY: &str = "Nenhum resumo disponível.";
pub const ANALYSIS_FAILED: &str = "Não foi possível gerar a análise neste momento.";

/// Summary, insights and recommendations extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAnalysis {
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

impl TicketAnalysis {
    /// Uniform result for any failed analysis.
    pub fn failed() -> Self {
        Self {
            summary: ANALYSIS_FAILED.to_string(),
            insights: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Prompt asking for a three-section analysis of the current tickets.
pub fn analysis_prompt(records: &[TicketRecord]) -> String {
    let counts = BucketCounts::tally(records);
    let to_json = |map| serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string());

    format!(
        "Analise os seguintes dados de chamados de suporte e forneça insights relevantes.\n\
         \n\
         Total de chamados: {}\n\
         Chamados abertos: {}\n\
         Prioridade alta: {}\n\
         \n\
         Distribuição por status: {}\n\
         Distribuição por prioridade: {}\n\
         Distribuição por categoria: {}\n\
         \n\
         Responda em português, em três blocos separados por uma linha em branco:\n\
         1. Um parágrafo curto resumindo o estado atual dos chamados\n\
         2. Principais insights (distribuição de carga, padrões de prioridade, tempos de resposta, gargalos), um por linha com marcador\n\
         3. Recomendações práticas para melhorar o atendimento, uma por linha com marcador",
        records.len(),
        counts.open,
        counts.high,
        to_json(status_counts(records)),
        to_json(priority_counts(records)),
        to_json(count_by_field(records, &TicketField::Raw("category".to_string()))),
    )
}

/// Split a reply into blank-line-delimited sections: summary, insights,
/// recommendations. Missing sections yield defaults.
pub fn parse_analysis(text: &str) -> TicketAnalysis {
    let normalized = text.replace("\r\n", "\n");
    let sections: Vec<&str> = normalized.split("\n\n").collect();

    let summary = sections
        .first()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_SUMMARY)
        .to_string();

    TicketAnalysis {
        summary,
        insights: extract_bullet_points(sections.get(1).copied().unwrap_or("")),
        recommendations: extract_bullet_points(sections.get(2).copied().unwrap_or("")),
    }
}

fn extract_bullet_points(section: &str) -> Vec<String> {
    section
        .lines()
        .map(|line| BULLET_RE.replace(line.trim_start(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Run a bulk analysis. Failures are logged and yield [`TicketAnalysis::failed`].
pub async fn analyze_tickets(
    provider: &dyn LLMProvider,
    records: &[TicketRecord],
    config: &GenerationConfig,
) -> TicketAnalysis {
    let prompt = analysis_prompt(records);
    match provider.generate(&prompt, config).await {
        Ok(text) => parse_analysis(&text),
        Err(e) => {
            tracing::warn!(error = %e, "Ticket analysis failed");
            TicketAnalysis::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::llm::ProviderInfo;
    use async_trait::async_trait;

    struct FixedProvider(Result<String, ()>);

    #[async_trait]
    impl LLMProvider for FixedProvider {
        async fn generate(&self, _: &str, _: &GenerationConfig) -> Result<String, GatewayError> {
            self.0.clone().map_err(|_| GatewayError::EmptyResponse)
        }

        fn info(&self) -> ProviderInfo {
            ProviderInfo { name: "fixed".into(), model: "fixed".into() }
        }
    }

    #[test]
    fn test_two_sections_with_bullets() {
        let analysis = parse_analysis("Resumo geral.\n\n- item A\n* item B");
        assert_eq!(analysis.summary, "Resumo geral.");
        assert_eq!(analysis.insights, vec!["item A", "item B"]);
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn test_three_sections() {
        let text = "Carga alta.\n\n• Suporte concentra 60%\n\n-Redistribuir chamados\n   \n*   Revisar SLA  ";
        let analysis = parse_analysis(text);
        assert_eq!(analysis.insights, vec!["Suporte concentra 60%"]);
        assert_eq!(analysis.recommendations, vec!["Redistribuir chamados", "Revisar SLA"]);
    }

    #[test]
    fn test_empty_reply_defaults() {
        let analysis = parse_analysis("");
        assert_eq!(analysis.summary, NO_SUMMARY);
        assert!(analysis.insights.is_empty());
    }

    #[test]
    fn test_prompt_embeds_counts() {
        let records = vec![
            TicketRecord { status: "Aberto".into(), priority: "Alta".into(), ..Default::default() },
            TicketRecord { status: "Fechado".into(), ..Default::default() },
        ];
        let prompt = analysis_prompt(&records);
        assert!(prompt.contains("Total de chamados: 2"));
        assert!(prompt.contains("Chamados abertos: 1"));
        assert!(prompt.contains(r#"{"Aberto":1,"Fechado":1}"#));
        assert!(prompt.contains(r#"{"Unknown":2}"#));
    }

    #[tokio::test]
    async fn test_analyze_failure_is_uniform() {
        let provider = FixedProvider(Err(()));
        let analysis = analyze_tickets(&provider, &[], &GenerationConfig::default()).await;
        assert_eq!(analysis, TicketAnalysis::failed());

        let provider = FixedProvider(Ok("Tudo certo.\n\n- sem filas".to_string()));
        let analysis = analyze_tickets(&provider, &[], &GenerationConfig::default()).await;
        assert_eq!(analysis.insights, vec!["sem filas"]);
    }
}
