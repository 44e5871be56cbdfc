// src/services/transition_policy.rs

use crate::{
    db::FollowUpRepair,
    models::{
        board::DenialReason,
        collection::{CollectionCase, Stage},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenialReason),
}

/// "Tem pelo menos um follow-up": lista nova OU o campo único antigo.
/// É o único lugar que conhece o formato legado.
pub fn has_follow_up(case: &CollectionCase) -> bool {
    !case.follow_ups.is_empty()
        || case
            .legacy_follow_up
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
}

/// Regras que liberam (ou não) o avanço de um caso no funil.
/// Só o avanço é controlado; o retorno de etapa passa direto.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionPolicy;

impl TransitionPolicy {
    /// Avaliação pura, sem tentar reparo. A primeira regra que falhar decide.
    pub fn check(&self, case: &CollectionCase, target: Stage) -> Decision {
        // 0. Só um passo para frente, nunca pulando etapas
        match case.stage.next() {
            None => return Decision::Deny(DenialReason::AlreadyAtLastStage),
            Some(next) if next != target => return Decision::Deny(DenialReason::InvalidTransition),
            Some(_) => {}
        }

        // 1. Sair de "inadimplente" exige follow-up
        if case.stage == Stage::Overdue && !has_follow_up(case) {
            return Decision::Deny(DenialReason::MissingFollowUp);
        }

        // 2. Entrar em "pagamento realizado" exige data de pagamento
        if target == Stage::PaymentMade && !case.has_payment_date() {
            return Decision::Deny(DenialReason::MissingPaymentDate);
        }

        Decision::Allow
    }

    /// Avaliação completa. Na falta de follow-up tenta um reparo automático:
    /// se o reparo mudou algo, pede para refazer o pedido.
    pub async fn evaluate(
        &self,
        case: &CollectionCase,
        target: Stage,
        repair: &dyn FollowUpRepair,
    ) -> Decision {
        let decision = self.check(case, target);
        if decision != Decision::Deny(DenialReason::MissingFollowUp) {
            return decision;
        }

        tracing::info!("Caso {} sem follow-ups. Tentando corrigir automaticamente...", case.id);

        match repair.repair_missing_follow_ups(&case.id).await {
            Ok(true) => {
                tracing::info!("Follow-ups corrigidos automaticamente para o caso {}", case.id);
                Decision::Deny(DenialReason::RetryAfterRepair)
            }
            Ok(false) => Decision::Deny(DenialReason::MissingFollowUp),
            Err(e) => {
                tracing::warn!("Reparo de follow-ups falhou para o caso {}: {}", case.id, e);
                Decision::Deny(DenialReason::MissingFollowUp)
            }
        }
    }

    /// Etapa de destino ao voltar um passo. `None` se já está na primeira.
    pub fn return_target(&self, case: &CollectionCase) -> Option<Stage> {
        if case.stage.is_first() {
            None
        } else {
            Some(case.stage.previous())
        }
    }
}
