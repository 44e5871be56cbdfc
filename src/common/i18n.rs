// src/common/i18n.rs

use std::collections::HashMap;

use crate::models::{
    board::{DenialReason, Notice},
    collection::Stage,
};

// --- Catálogos de mensagens ---

const PT: &[(&str, &str)] = &[
    // Colunas
    ("stage.overdue", "Casos Inadimplentes"),
    ("stage.message_sent", "Mensagem Enviada"),
    ("stage.reply_received", "Resposta Recebida"),
    ("stage.payment_made", "Pagamento Realizado"),
    // Resultados
    ("outcome.applied", "Status atualizado com sucesso."),
    ("outcome.updated", "Dados atualizados com sucesso."),
    ("outcome.removed", "Caso excluído com sucesso."),
    ("outcome.saved", "Todas as alterações foram salvas."),
    ("outcome.invalid", "Um ou mais campos são inválidos."),
    ("outcome.not_found", "Caso não encontrado."),
    ("outcome.failed", "Erro ao salvar. A alteração foi desfeita."),
    // Recusas
    ("denial.missing-follow-up", "Follow-up obrigatório"),
    ("denial.retry-after-repair", "Follow-ups corrigidos"),
    ("denial.missing-payment-date", "Data de pagamento obrigatória"),
    ("denial.already-at-last-stage", "O caso já está na última etapa"),
    ("denial.invalid-transition", "Movimento não permitido"),
    ("denial.forbidden-edit", "Sem permissão para editar"),
    ("hint.missing-follow-up", "Adicione pelo menos um follow-up antes de mover o caso."),
    ("hint.retry-after-repair", "Os follow-ups foram corrigidos automaticamente. Tente mover o caso novamente."),
    ("hint.missing-payment-date", "Informe a data de pagamento antes de mover para Pagamento Realizado."),
    ("hint.already-at-last-stage", "Não há etapa seguinte."),
    ("hint.invalid-transition", "Os casos avançam uma etapa por vez."),
    ("hint.forbidden-edit", "Apenas quem criou o caso ou um administrador pode editar estes dados."),
    // Avisos
    ("notice.already-at-first-stage", "O caso já está na primeira etapa."),
    ("notice.nothing-to-save", "Não há dados para salvar."),
    // Erros
    ("error.validation", "Um ou mais campos são inválidos."),
    ("error.not_found", "Recurso não encontrado."),
    ("error.invalid_period", "Período inválido. Use o formato AAAA-MM."),
    ("error.store_unavailable", "Banco de dados indisponível. Tente novamente."),
    ("error.database", "Ocorreu um erro no banco de dados."),
    ("error.internal", "Ocorreu um erro inesperado."),
];

const EN: &[(&str, &str)] = &[
    ("stage.overdue", "Overdue Cases"),
    ("stage.message_sent", "Message Sent"),
    ("stage.reply_received", "Reply Received"),
    ("stage.payment_made", "Payment Made"),
    ("outcome.applied", "Status updated successfully."),
    ("outcome.updated", "Data updated successfully."),
    ("outcome.removed", "Case deleted successfully."),
    ("outcome.saved", "All changes were saved."),
    ("outcome.invalid", "One or more fields are invalid."),
    ("outcome.not_found", "Case not found."),
    ("outcome.failed", "Could not save. The change was reverted."),
    ("denial.missing-follow-up", "Follow-up required"),
    ("denial.retry-after-repair", "Follow-ups repaired"),
    ("denial.missing-payment-date", "Payment date required"),
    ("denial.already-at-last-stage", "The case is already at the last stage"),
    ("denial.invalid-transition", "Move not allowed"),
    ("denial.forbidden-edit", "Not allowed to edit"),
    ("hint.missing-follow-up", "Add at least one follow-up before moving the case."),
    ("hint.retry-after-repair", "Follow-ups were repaired automatically. Try moving the case again."),
    ("hint.missing-payment-date", "Fill in the payment date before moving to Payment Made."),
    ("hint.already-at-last-stage", "There is no next stage."),
    ("hint.invalid-transition", "Cases move forward one stage at a time."),
    ("hint.forbidden-edit", "Only the case creator or an administrator can edit this data."),
    ("notice.already-at-first-stage", "The case is already at the first stage."),
    ("notice.nothing-to-save", "There is no data to save."),
    ("error.validation", "One or more fields are invalid."),
    ("error.not_found", "Resource not found."),
    ("error.invalid_period", "Invalid period. Use the YYYY-MM format."),
    ("error.store_unavailable", "Database unavailable. Please try again."),
    ("error.database", "A database error occurred."),
    ("error.internal", "An unexpected error occurred."),
];

/// Mensagens por idioma. Idioma desconhecido cai no padrão; chave
/// desconhecida volta como a própria chave.
#[derive(Debug, Clone)]
pub struct I18nStore {
    default_lang: String,
    catalogs: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new(default_lang: &str) -> Self {
        let mut catalogs = HashMap::new();
        catalogs.insert("pt", PT.iter().copied().collect());
        catalogs.insert("en", EN.iter().copied().collect());

        let default_lang = if catalogs.contains_key(default_lang) {
            default_lang.to_string()
        } else {
            tracing::warn!("Idioma padrão '{}' sem catálogo, usando 'pt'", default_lang);
            "pt".to_string()
        };

        Self { default_lang, catalogs }
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.catalogs
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| {
                self.catalogs
                    .get(self.default_lang.as_str())
                    .and_then(|catalog| catalog.get(key))
            })
            .map(|text| text.to_string())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn stage_title(&self, lang: &str, stage: Stage) -> String {
        self.translate(lang, &format!("stage.{}", stage.as_str()))
    }

    pub fn denial(&self, lang: &str, reason: DenialReason) -> (String, String) {
        (
            self.translate(lang, &format!("denial.{}", reason.code())),
            self.translate(lang, &format!("hint.{}", reason.code())),
        )
    }

    pub fn notice(&self, lang: &str, notice: Notice) -> String {
        self.translate(lang, &format!("notice.{}", notice.code()))
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new("pt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_titles_in_portuguese() {
        let i18n = I18nStore::default();
        assert_eq!(i18n.stage_title("pt", Stage::Overdue), "Casos Inadimplentes");
        assert_eq!(i18n.stage_title("pt", Stage::PaymentMade), "Pagamento Realizado");
    }

    #[test]
    fn unknown_language_falls_back_to_default() {
        let i18n = I18nStore::new("pt");
        assert_eq!(i18n.notice("fr", Notice::NothingToSave), "Não há dados para salvar.");
        assert_eq!(i18n.notice("en", Notice::NothingToSave), "There is no data to save.");
    }

    #[test]
    fn every_key_exists_in_both_catalogs() {
        let pt: Vec<&str> = PT.iter().map(|(k, _)| *k).collect();
        let en: Vec<&str> = EN.iter().map(|(k, _)| *k).collect();
        assert_eq!(pt, en);
    }

    #[test]
    fn denial_has_title_and_hint() {
        let i18n = I18nStore::default();
        let (title, hint) = i18n.denial("pt", DenialReason::MissingFollowUp);
        assert_eq!(title, "Follow-up obrigatório");
        assert!(hint.contains("follow-up"));
    }

    #[test]
    fn unknown_key_returns_itself() {
        let i18n = I18nStore::new("xx");
        assert_eq!(i18n.default_lang(), "pt");
        assert_eq!(i18n.translate("pt", "nope"), "nope");
    }
}
