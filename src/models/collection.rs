// src/models/collection.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::services::case_validation::{validate_amount, validate_required_text};

// --- Enums ---

/// Etapas fixas do funil de cobrança, na ordem em que um caso avança.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "collection_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Overdue,
    MessageSent,
    ReplyReceived,
    PaymentMade,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Overdue,
        Stage::MessageSent,
        Stage::ReplyReceived,
        Stage::PaymentMade,
    ];

    /// Próxima etapa do funil. `None` na etapa final.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Overdue => Some(Stage::MessageSent),
            Stage::MessageSent => Some(Stage::ReplyReceived),
            Stage::ReplyReceived => Some(Stage::PaymentMade),
            Stage::PaymentMade => None,
        }
    }

    /// Mapa de retorno. A primeira etapa aponta para si mesma.
    pub fn previous(self) -> Stage {
        match self {
            Stage::Overdue => Stage::Overdue,
            Stage::MessageSent => Stage::Overdue,
            Stage::ReplyReceived => Stage::MessageSent,
            Stage::PaymentMade => Stage::ReplyReceived,
        }
    }

    pub fn is_first(self) -> bool {
        self == Stage::Overdue
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::PaymentMade
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Overdue => "overdue",
            Stage::MessageSent => "message_sent",
            Stage::ReplyReceived => "reply_received",
            Stage::PaymentMade => "payment_made",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Histórico ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from_stage: Stage,
    pub to_stage: Stage,
    #[schema(example = "maria")]
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Histórico de mudanças de etapa. Só cresce: não há API para editar ou remover entradas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct StatusHistory(Vec<StatusChange>);

impl StatusHistory {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn append(&mut self, entry: StatusChange) {
        self.0.push(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&StatusChange> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StatusChange> {
        self.0.iter()
    }
}

impl From<Vec<StatusChange>> for StatusHistory {
    fn from(entries: Vec<StatusChange>) -> Self {
        Self(entries)
    }
}

// --- Follow-ups ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    #[schema(example = "Enviado lembrete por WhatsApp")]
    pub content: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Caso de cobrança ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCase {
    #[schema(example = "1")]
    pub id: String,

    #[validate(custom(function = "validate_required_text"))]
    #[schema(example = "João da Silva")]
    pub display_name: String,

    #[serde(default)]
    #[schema(example = "Engenharia")]
    pub course: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    #[schema(example = "(11) 99999-8888")]
    pub phone: Option<String>,

    #[validate(custom(function = "validate_amount"))]
    #[schema(example = "350.00")]
    pub amount: Decimal,

    // Texto DD/MM/YYYY, como veio da planilha de origem
    #[serde(default)]
    #[schema(example = "10/01/2025")]
    pub due_date: Option<String>,

    #[serde(default)]
    pub days_overdue: i64,

    pub stage: Stage,

    #[serde(default)]
    pub status_history: StatusHistory,

    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,

    // Campo único de follow-up anterior à migração para a lista
    #[serde(default)]
    pub legacy_follow_up: Option<String>,

    // Observações
    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    #[schema(example = "15/01/2025")]
    pub payment_date: Option<String>,

    #[serde(default)]
    pub created_by: Option<String>,

    #[schema(example = "2025-01")]
    pub month: String,

    #[serde(default)]
    pub first_contact: Option<String>,

    #[serde(default)]
    pub last_contact: Option<String>,
}

impl CollectionCase {
    /// Caso mínimo na primeira etapa; o resto vem das importações.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, month: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            course: None,
            email: None,
            phone: None,
            amount: Decimal::ZERO,
            due_date: None,
            days_overdue: 0,
            stage: Stage::Overdue,
            status_history: StatusHistory::new(),
            follow_ups: Vec::new(),
            legacy_follow_up: None,
            notes: String::new(),
            payment_date: None,
            created_by: None,
            month: month.into(),
            first_contact: None,
            last_contact: None,
        }
    }

    pub fn has_payment_date(&self) -> bool {
        self.payment_date
            .as_deref()
            .is_some_and(|date| !date.trim().is_empty())
    }
}
