// src/models/board.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::collection::{CollectionCase, Stage};

// --- Resultado das operações do quadro ---

/// Motivos de recusa que o usuário consegue corrigir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DenialReason {
    MissingFollowUp,
    // O reparo automático mudou algo: o pedido deve ser refeito
    RetryAfterRepair,
    MissingPaymentDate,
    AlreadyAtLastStage,
    InvalidTransition,
    ForbiddenEdit,
}

impl DenialReason {
    pub fn code(self) -> &'static str {
        match self {
            DenialReason::MissingFollowUp => "missing-follow-up",
            DenialReason::RetryAfterRepair => "retry-after-repair",
            DenialReason::MissingPaymentDate => "missing-payment-date",
            DenialReason::AlreadyAtLastStage => "already-at-last-stage",
            DenialReason::InvalidTransition => "invalid-transition",
            DenialReason::ForbiddenEdit => "forbidden-edit",
        }
    }
}

/// Avisos informativos (não são erro).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Notice {
    AlreadyAtFirstStage,
    NothingToSave,
}

impl Notice {
    pub fn code(self) -> &'static str {
        match self {
            Notice::AlreadyAtFirstStage => "already-at-first-stage",
            Notice::NothingToSave => "nothing-to-save",
        }
    }
}

/// O que cada operação do quadro devolve. Nenhuma operação propaga erro:
/// falhas de persistência já chegam aqui revertidas.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Applied { case: CollectionCase },
    Removed { id: String },
    Saved { count: usize },
    Info { notice: Notice },
    Denied { reason: DenialReason },
    // Campo -> código do erro de validação
    Invalid { fields: BTreeMap<String, Vec<String>> },
    NotFound { id: String },
    Failed { retry_suggested: bool },
    // Já havia uma operação em andamento para o mesmo caso
    Ignored,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Applied { .. } | Outcome::Removed { .. } | Outcome::Saved { .. }
        )
    }

    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            Outcome::Denied { reason } => Some(*reason),
            _ => None,
        }
    }
}

// --- Visão agrupada ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageColumn {
    pub stage: Stage,
    #[schema(example = "Mensagem Enviada")]
    pub title: String,
    pub count: usize,
    pub cases: Vec<CollectionCase>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub columns: Vec<StageColumn>,
    // "Exibindo {shown} de {total}"
    pub shown: usize,
    pub total: usize,
    pub is_filtered: bool,
    #[schema(example = "2025-01")]
    pub period: Option<String>,
}

/// Indicadores do topo do quadro, por faixa de atraso.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardMetrics {
    pub total: usize,
    pub up_to_5_days: usize,
    pub up_to_10_days: usize,
    pub over_10_days: usize,
    pub payment_made: usize,
}

// --- Feed de mudanças ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    Changed { case: CollectionCase },
    Removed { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub kind: ChangeKind,
    pub at: DateTime<Utc>,
}
