//! Row normalization: raw tabular rows into canonical [`TicketRecord`]s.
//!
//! Two layouts are supported. Normalization is total: short or malformed rows
//! degrade to empty strings and nothing is ever rejected.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::TicketRecord;

/// Converts a full sheet of rows into ticket records.
pub trait RowNormalizer: Send + Sync {
    fn normalize(&self, rows: &[Vec<String>]) -> Vec<TicketRecord>;
}

/// Column layout of a tabular source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowLayout {
    /// Fixed 13-column order, no header row.
    #[serde(rename = "positional")]
    Positional,
    /// First row is a header; columns are matched by name.
    #[serde(rename = "header")]
    HeaderDriven,
}

impl RowLayout {
    pub fn normalizer(self) -> Box<dyn RowNormalizer> {
        match self {
            Self::Positional => Box::new(PositionalNormalizer),
            Self::HeaderDriven => Box::new(HeaderNormalizer),
        }
    }
}

// ============================================================================
// Positional layout
// ============================================================================

/// Column order: id, opened, closed, status, priority, reason, solution,
/// requester, agent, department, TMA, FRT, satisfaction.
pub struct PositionalNormalizer;

impl RowNormalizer for PositionalNormalizer {
    fn normalize(&self, rows: &[Vec<String>]) -> Vec<TicketRecord> {
        rows.iter()
            .map(|row| {
                let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
                TicketRecord {
                    id: cell(0),
                    created_at: cell(1),
                    updated_at: cell(2),
                    status: cell(3),
                    priority: cell(4),
                    title: cell(5),
                    description: cell(6),
                    requester: cell(7),
                    assignee: cell(8),
                    department: cell(9),
                    tma: cell(10),
                    frt: cell(11),
                    satisfaction: cell(12),
                    raw: HashMap::new(),
                }
            })
            .collect()
    }
}

// ============================================================================
// Header-driven layout
// ============================================================================

const ID_HEADERS: &[&str] = &["ID", "Id", "id", "Ticket ID", "ticket_id", "ID do Chamado"];
const TITLE_HEADERS: &[&str] = &["Title", "Título", "title", "titulo", "Motivo"];
const DESCRIPTION_HEADERS: &[&str] = &["Description", "Descrição", "description", "Solução"];
const STATUS_HEADERS: &[&str] = &["Status", "status"];
const PRIORITY_HEADERS: &[&str] = &["Priority", "priority", "Prioridade", "prioridade"];
const ASSIGNEE_HEADERS: &[&str] = &[
    "Assignee",
    "Responsavel",
    "Responsável",
    "assignee",
    "Agente Responsável",
];
const REQUESTER_HEADERS: &[&str] = &["Requester", "Solicitante", "requester"];
const CREATED_HEADERS: &[&str] = &["Created At", "Data de abertura", "Data de Abertura", "created_at"];
const UPDATED_HEADERS: &[&str] = &[
    "Updated At",
    "Data de atualização",
    "Data de Fechamento",
    "updated_at",
];
const DEPARTMENT_HEADERS: &[&str] = &["Department", "Departamento", "Setor", "setor", "departamento"];
const TMA_HEADERS: &[&str] = &["TMA", "TMA (minutos)", "tma"];
const FRT_HEADERS: &[&str] = &["FRT", "FRT (minutos)", "frt"];
const SATISFACTION_HEADERS: &[&str] = &[
    "Satisfaction",
    "Satisfação",
    "Satisfação do Cliente",
    "satisfaction",
];

/// Matches columns by exact, case-sensitive header synonyms.
pub struct HeaderNormalizer;

impl HeaderNormalizer {
    fn row_map(headers: &[String], row: &[String]) -> HashMap<String, String> {
        headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
            .collect()
    }
}

/// First synonym whose column holds a non-empty value.
fn resolve(raw: &HashMap<String, String>, synonyms: &[&str]) -> String {
    synonyms
        .iter()
        .filter_map(|name| raw.get(*name))
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_default()
}

impl RowNormalizer for HeaderNormalizer {
    fn normalize(&self, rows: &[Vec<String>]) -> Vec<TicketRecord> {
        let Some((header_row, body)) = rows.split_first() else {
            return Vec::new();
        };
        let headers: Vec<String> = header_row.iter().map(|h| h.trim().to_string()).collect();

        body.iter()
            .map(|row| {
                let raw = Self::row_map(&headers, row);
                TicketRecord {
                    id: resolve(&raw, ID_HEADERS),
                    created_at: resolve(&raw, CREATED_HEADERS),
                    updated_at: resolve(&raw, UPDATED_HEADERS),
                    status: resolve(&raw, STATUS_HEADERS).trim().to_string(),
                    priority: resolve(&raw, PRIORITY_HEADERS).trim().to_string(),
                    title: resolve(&raw, TITLE_HEADERS),
                    description: resolve(&raw, DESCRIPTION_HEADERS),
                    requester: resolve(&raw, REQUESTER_HEADERS),
                    assignee: resolve(&raw, ASSIGNEE_HEADERS),
                    department: resolve(&raw, DEPARTMENT_HEADERS),
                    tma: resolve(&raw, TMA_HEADERS),
                    frt: resolve(&raw, FRT_HEADERS),
                    satisfaction: resolve(&raw, SATISFACTION_HEADERS),
                    raw,
                }
            })
            .collect()
    }
}
