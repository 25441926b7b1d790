//! Deterministic, rule-based answers computed directly from ticket records.
//!
//! Used whenever the remote model cannot answer. Recognizes a small fixed
//! vocabulary; anything else gets the default summary.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::temporal::detect_period_at;
use crate::analytics::{parse_ticket_date, BucketCounts};
use crate::types::{TemporalWindow, TicketRecord};

/// Department / entity vocabulary, checked in this order.
pub const DEPARTMENT_KEYWORDS: &[&str] = &[
    "marketing",
    "vendas",
    "sales",
    "financeiro",
    "finance",
    "rh",
    "hr",
    "suporte",
    "support",
    "ti",
    "comercial",
    "commercial",
];

/// Keywords short enough to occur inside unrelated words ("ti" in "últimos");
/// these must appear as a whole word. The rest match as substrings.
const WHOLE_WORD_KEYWORDS: &[&str] = &["ti", "rh", "hr"];

/// Single bucket a count question can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountTarget {
    Open,
    InProgress,
    Closed,
    HighPriority,
    MediumPriority,
    LowPriority,
}

impl CountTarget {
    fn label(self) -> &'static str {
        match self {
            Self::Open => "Chamados abertos",
            Self::InProgress => "Chamados em andamento",
            Self::Closed => "Chamados fechados",
            Self::HighPriority => "Prioridade alta",
            Self::MediumPriority => "Prioridade média",
            Self::LowPriority => "Prioridade baixa",
        }
    }

    fn count(self, counts: &BucketCounts) -> usize {
        match self {
            Self::Open => counts.open,
            Self::InProgress => counts.in_progress,
            Self::Closed => counts.closed,
            Self::HighPriority => counts.high,
            Self::MediumPriority => counts.medium,
            Self::LowPriority => counts.low,
        }
    }
}

struct CountRule {
    phrases: &'static [&'static str],
    target: CountTarget,
}

/// Status / priority keyword groups, checked in this order.
const COUNT_RULES: &[CountRule] = &[
    CountRule { phrases: &["abert", "open"], target: CountTarget::Open },
    CountRule { phrases: &["andamento", "in progress"], target: CountTarget::InProgress },
    CountRule { phrases: &["fechad", "closed"], target: CountTarget::Closed },
    CountRule {
        phrases: &["prioridade alta", "high priority"],
        target: CountTarget::HighPriority,
    },
    CountRule {
        phrases: &["prioridade média", "prioridade media", "medium priority"],
        target: CountTarget::MediumPriority,
    },
    CountRule {
        phrases: &["prioridade baixa", "low priority"],
        target: CountTarget::LowPriority,
    },
];

/// What kind of answer a question gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalIntent {
    Department(&'static str),
    Count(CountTarget),
    Summary,
}

/// Classify a question. Department keywords beat status/priority keywords.
pub fn classify_question(question: &str) -> LocalIntent {
    let q = question.to_lowercase();

    let words: Vec<&str> = q.split(|c: char| !c.is_alphanumeric()).collect();
    let mentioned = |kw: &str| {
        if WHOLE_WORD_KEYWORDS.iter().any(|short| *short == kw) {
            words.iter().any(|word| *word == kw)
        } else {
            q.contains(kw)
        }
    };
    if let Some(keyword) = DEPARTMENT_KEYWORDS.iter().find(|kw| mentioned(**kw)) {
        return LocalIntent::Department(*keyword);
    }

    COUNT_RULES
        .iter()
        .find(|rule| rule.phrases.iter().any(|p| q.contains(p)))
        .map(|rule| LocalIntent::Count(rule.target))
        .unwrap_or(LocalIntent::Summary)
}

/// Answer `question` from `records` alone. Never fails, never empty.
pub fn answer_locally(records: &[TicketRecord], question: &str) -> String {
    answer_locally_at(records, question, Local::now().naive_local())
}

/// [`answer_locally`] with an explicit clock for relative periods.
pub fn answer_locally_at(records: &[TicketRecord], question: &str, now: NaiveDateTime) -> String {
    let window = detect_period_at(question, now);
    let scoped: Vec<&TicketRecord> = records
        .iter()
        .filter(|r| in_window(r, window.as_ref()))
        .collect();

    match classify_question(question) {
        LocalIntent::Department(keyword) => {
            let matching: Vec<&TicketRecord> = scoped
                .iter()
                .copied()
                .filter(|r| mentions(r, keyword))
                .collect();
            let counts = BucketCounts::tally(matching.iter().copied());
            let period_text = if window.is_some() { " no período selecionado" } else { "" };
            format!(
                "{}: {} chamados (Abertos: {}, Em andamento: {}, Fechados: {}){}.",
                capitalize(keyword),
                matching.len(),
                counts.open,
                counts.in_progress,
                counts.closed,
                period_text
            )
        }
        LocalIntent::Count(target) => {
            let counts = BucketCounts::tally(scoped.iter().copied());
            format!("{}: {}.", target.label(), target.count(&counts))
        }
        LocalIntent::Summary => {
            let counts = BucketCounts::tally(scoped.iter().copied());
            let period_text = if window.is_some() { " (no período selecionado)" } else { "" };
            format!(
                "Resumo rápido{}:\n- Total: {}\n- Abertos: {}\n- Em andamento: {}\n- Fechados: {}\n- Alta: {}\n- Média: {}\n- Baixa: {}",
                period_text,
                scoped.len(),
                counts.open,
                counts.in_progress,
                counts.closed,
                counts.high,
                counts.medium,
                counts.low
            )
        }
    }
}

fn in_window(record: &TicketRecord, window: Option<&TemporalWindow>) -> bool {
    let Some(window) = window else {
        return true;
    };
    parse_ticket_date(&record.created_at)
        .or_else(|| parse_ticket_date(&record.updated_at))
        .is_some_and(|at| window.contains(at))
}

fn mentions(record: &TicketRecord, keyword: &str) -> bool {
    [
        &record.department,
        &record.assignee,
        &record.requester,
        &record.title,
        &record.description,
    ]
    .iter()
    .any(|text| text.to_lowercase().contains(keyword))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
