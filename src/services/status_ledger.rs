// src/services/status_ledger.rs

use chrono::{DateTime, Utc};

use crate::models::{
    actor::Actor,
    collection::{CollectionCase, Stage, StatusChange},
};

/// Aplica a mudança de etapa e registra a entrada no histórico, juntas.
/// O caso original não é tocado; quem chama decide o que fazer com a cópia.
pub fn record_stage_change(
    case: &CollectionCase,
    to: Stage,
    actor: &Actor,
    at: DateTime<Utc>,
) -> (CollectionCase, StatusChange) {
    let entry = StatusChange {
        from_stage: case.stage,
        to_stage: to,
        changed_by: actor.display_name().to_string(),
        changed_at: at,
    };

    let mut updated = case.clone();
    updated.stage = to;
    updated.status_history.append(entry.clone());

    (updated, entry)
}
