// src/services/board_controller.rs

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::{
    common::error::AppError,
    db::{FollowUpRepair, RecordStore},
    models::{
        actor::Actor,
        board::{BoardMetrics, BoardView, DenialReason, Notice, Outcome},
        collection::{CollectionCase, Stage, StatusChange},
    },
    services::{
        board_metrics::compute_metrics,
        case_validation::{can_edit_details, can_edit_notes, details_changed, error_codes, validate_case},
        change_feed::RecordObserver,
        clock::{Clock, SystemClock},
        days_overdue::DaysOverdueCalculator,
        in_flight::InFlight,
        period_filter::{PaymentMonthFilter, PeriodFilter},
        stage_index::{group_by_stage, PeriodSelection, StageGroups},
        status_ledger::record_stage_change,
        transition_policy::{Decision, TransitionPolicy},
    },
};

/// O que vem de fora: a lista completa (fonte da verdade) e, quando há
/// filtro de busca ativo, a lista já filtrada que deve ser exibida.
#[derive(Debug, Clone, Default)]
pub struct BoardSource {
    pub cases: Vec<CollectionCase>,
    pub filtered: Option<Vec<CollectionCase>>,
}

impl BoardSource {
    pub fn new(cases: Vec<CollectionCase>) -> Self {
        Self { cases, filtered: None }
    }

    pub fn with_filtered(mut self, filtered: Vec<CollectionCase>) -> Self {
        self.filtered = Some(filtered);
        self
    }
}

#[derive(Debug, Default)]
struct BoardState {
    source: Vec<CollectionCase>,
    filtered: Option<Vec<CollectionCase>>,
    // Cópia de trabalho: o que o usuário vê, já com as mutações otimistas
    working: Vec<CollectionCase>,
    calculator: DaysOverdueCalculator,
    computed_for: Option<NaiveDate>,
    period: PeriodSelection,
}

impl BoardState {
    fn rebuild_working(&mut self, today: NaiveDate) {
        let base = self.filtered.as_ref().unwrap_or(&self.source);
        let mut working = Vec::with_capacity(base.len());
        for case in base {
            working.push(self.calculator.refresh(case.clone(), today));
        }
        self.working = working;
        self.computed_for = Some(today);
    }

    // O valor só muda quando o dia vira
    fn ensure_fresh(&mut self, today: NaiveDate) {
        if self.computed_for == Some(today) {
            return;
        }
        for case in self.working.iter_mut() {
            case.days_overdue = self.calculator.compute(case, today);
        }
        self.computed_for = Some(today);
    }

    fn working_case(&self, id: &str) -> Option<&CollectionCase> {
        self.working.iter().find(|c| c.id == id)
    }

    /// Versão confirmada de um caso: a lista completa, ou a filtrada.
    fn authoritative_case(&self, id: &str) -> Option<CollectionCase> {
        self.source
            .iter()
            .chain(self.filtered.iter().flatten())
            .find(|c| c.id == id)
            .cloned()
    }

    fn replace_working(&mut self, case: CollectionCase, today: NaiveDate) -> CollectionCase {
        let case = self.calculator.refresh(case, today);
        if let Some(slot) = self.working.iter_mut().find(|c| c.id == case.id) {
            *slot = case.clone();
        }
        case
    }

    /// Grava na fonte da verdade o que o banco confirmou.
    fn commit(&mut self, case: &CollectionCase) {
        match self.source.iter_mut().find(|c| c.id == case.id) {
            Some(slot) => *slot = case.clone(),
            None => self.source.push(case.clone()),
        }
        if let Some(filtered) = self.filtered.as_mut() {
            if let Some(slot) = filtered.iter_mut().find(|c| c.id == case.id) {
                *slot = case.clone();
            }
        }
    }

    fn forget(&mut self, id: &str) {
        self.working.retain(|c| c.id != id);
        self.source.retain(|c| c.id != id);
        if let Some(filtered) = self.filtered.as_mut() {
            filtered.retain(|c| c.id != id);
        }
        if let PeriodSelection::Active { ids, .. } = &mut self.period {
            ids.remove(id);
        }
    }
}

// Mantém o primeiro de cada id: o conjunto de trabalho não tem ids repetidos
fn dedupe(cases: Vec<CollectionCase>) -> Vec<CollectionCase> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(cases.len());
    for case in cases {
        if seen.insert(case.id.clone()) {
            unique.push(case);
        } else {
            tracing::warn!("Caso {} duplicado na fonte; mantendo a primeira ocorrência", case.id);
        }
    }
    unique
}

/// Observador que não faz nada, para quando ninguém assina o quadro.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl RecordObserver for NoopObserver {
    fn on_record_changed(&self, _case: &CollectionCase) {}
    fn on_record_removed(&self, _id: &str) {}
}

/// Dono da cópia de trabalho do quadro de cobrança.
///
/// Toda mutação segue o mesmo roteiro: validação, mutação local imediata,
/// aviso ao observador, persistência, e reversão para a versão confirmada
/// se a persistência falhar. Nenhuma operação devolve erro; o resultado
/// vem sempre como [`Outcome`].
pub struct BoardController {
    store: Arc<dyn RecordStore>,
    repair: Arc<dyn FollowUpRepair>,
    period_filter: Arc<dyn PeriodFilter>,
    observer: Arc<dyn RecordObserver>,
    clock: Arc<dyn Clock>,
    policy: TransitionPolicy,
    in_flight: InFlight,
    saving: AtomicBool,
    state: Mutex<BoardState>,
}

impl BoardController {
    pub fn new(store: Arc<dyn RecordStore>, repair: Arc<dyn FollowUpRepair>) -> Self {
        Self {
            store,
            repair,
            period_filter: Arc::new(PaymentMonthFilter),
            observer: Arc::new(NoopObserver),
            clock: Arc::new(SystemClock),
            policy: TransitionPolicy,
            in_flight: InFlight::new(),
            saving: AtomicBool::new(false),
            state: Mutex::new(BoardState::default()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RecordObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_period_filter(mut self, period_filter: Arc<dyn PeriodFilter>) -> Self {
        self.period_filter = period_filter;
        self
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    //  CARGA E SINCRONIZAÇÃO
    // =========================================================================

    /// Busca tudo no banco e substitui a fonte da verdade.
    pub async fn load(&self) -> Result<usize, AppError> {
        let cases = self.store.fetch_all().await?;
        let count = cases.len();
        self.sync_source(BoardSource::new(cases)).await;
        tracing::info!("✅ Quadro carregado: {} casos", count);
        Ok(count)
    }

    /// Troca as entradas externas e reconstrói a cópia de trabalho inteira.
    pub async fn sync_source(&self, source: BoardSource) {
        let today = self.clock.today();
        {
            let mut state = self.state();
            state.source = dedupe(source.cases);
            state.filtered = source.filtered.map(dedupe);
            state.rebuild_working(today);
            tracing::debug!("Estado sincronizado: {} casos", state.working.len());
        }
        self.refresh_period().await;
    }

    /// Ativa (ou desliga, com `None`) o filtro de período da coluna de pagamentos.
    pub async fn set_period(&self, period: Option<String>) {
        {
            let mut state = self.state();
            state.period = match period {
                None => PeriodSelection::Inactive,
                Some(period) => PeriodSelection::Active { period, ids: HashSet::new() },
            };
        }
        self.refresh_period().await;
    }

    async fn refresh_period(&self) {
        let (period, snapshot) = {
            let state = self.state();
            match state.period.period() {
                None => return,
                Some(period) => (period.to_string(), state.working.clone()),
            }
        };

        tracing::debug!("Filtrando pagamentos para o período {}", period);
        let ids: HashSet<String> = match self.period_filter.filter_by_period(&snapshot, &period).await {
            Ok(cases) => cases.into_iter().map(|c| c.id).collect(),
            Err(e) => {
                tracing::error!("❌ Erro ao filtrar pagamentos do período {}: {}", period, e);
                HashSet::new()
            }
        };

        let mut state = self.state();
        // Só aplica se ninguém trocou o período enquanto filtrávamos
        if state.period.period() == Some(period.as_str()) {
            state.period = PeriodSelection::Active { period, ids };
        }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub fn case(&self, id: &str) -> Option<CollectionCase> {
        let today = self.clock.today();
        let mut state = self.state();
        state.ensure_fresh(today);
        state.working_case(id).cloned()
    }

    pub fn working_set(&self) -> Vec<CollectionCase> {
        let today = self.clock.today();
        let mut state = self.state();
        state.ensure_fresh(today);
        state.working.clone()
    }

    pub fn groups(&self) -> StageGroups {
        let today = self.clock.today();
        let mut state = self.state();
        state.ensure_fresh(today);
        group_by_stage(&state.working, &state.period)
    }

    pub fn view(&self, title: impl Fn(Stage) -> String) -> BoardView {
        let today = self.clock.today();
        let mut state = self.state();
        state.ensure_fresh(today);

        let groups = group_by_stage(&state.working, &state.period);
        let shown = groups.shown();
        BoardView {
            columns: groups.into_columns(title),
            shown,
            total: state.source.len(),
            is_filtered: state.filtered.is_some(),
            period: state.period.period().map(str::to_string),
        }
    }

    pub fn metrics(&self) -> BoardMetrics {
        let today = self.clock.today();
        let mut state = self.state();
        state.ensure_fresh(today);
        compute_metrics(&state.working)
    }

    pub fn is_busy(&self, id: &str) -> bool {
        self.in_flight.is_busy(id)
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    /// Avança o caso para `target` (sempre a etapa seguinte).
    pub async fn request_transition(&self, id: &str, target: Stage, actor: &Actor) -> Outcome {
        let Some(_guard) = self.in_flight.try_acquire(id) else {
            tracing::warn!("Caso {} já está sendo processado, ignorando", id);
            return Outcome::Ignored;
        };

        let Some(case) = self.case(id) else {
            tracing::warn!("Caso {} não encontrado", id);
            return Outcome::NotFound { id: id.to_string() };
        };

        match self.policy.evaluate(&case, target, self.repair.as_ref()).await {
            Decision::Allow => {}
            Decision::Deny(DenialReason::RetryAfterRepair) => {
                self.refresh_from_store(id).await;
                return Outcome::Denied { reason: DenialReason::RetryAfterRepair };
            }
            Decision::Deny(reason) => {
                tracing::warn!("Transição {} -> {} negada para o caso {}: {}", case.stage, target, id, reason.code());
                return Outcome::Denied { reason };
            }
        }

        // A avaliação pode ter esperado pelo reparo; confere de novo com o estado atual
        let Some(case) = self.case(id) else {
            return Outcome::NotFound { id: id.to_string() };
        };
        if let Decision::Deny(reason) = self.policy.check(&case, target) {
            return Outcome::Denied { reason };
        }

        let (updated, entry) = record_stage_change(&case, target, actor, self.clock.now());
        self.apply_stage_change(case, updated, entry).await
    }

    /// Volta o caso uma etapa. Na primeira etapa é só um aviso.
    pub async fn return_to_previous(&self, id: &str, actor: &Actor) -> Outcome {
        let Some(_guard) = self.in_flight.try_acquire(id) else {
            tracing::warn!("Caso {} já está sendo processado, ignorando", id);
            return Outcome::Ignored;
        };

        let Some(case) = self.case(id) else {
            tracing::warn!("Caso {} não encontrado", id);
            return Outcome::NotFound { id: id.to_string() };
        };

        let Some(target) = self.policy.return_target(&case) else {
            return Outcome::Info { notice: Notice::AlreadyAtFirstStage };
        };

        let (updated, entry) = record_stage_change(&case, target, actor, self.clock.now());
        self.apply_stage_change(case, updated, entry).await
    }

    async fn apply_stage_change(
        &self,
        before: CollectionCase,
        updated: CollectionCase,
        entry: StatusChange,
    ) -> Outcome {
        let id = updated.id.clone();
        let (authoritative, updated) = self.apply_optimistic(updated);

        match self.store.append_status_history(&id, &entry).await {
            Ok(()) => {
                self.state().commit(&updated);
                tracing::info!(
                    "Caso {} movido de {} para {} por {}",
                    id, entry.from_stage, entry.to_stage, entry.changed_by
                );
                self.refresh_period().await;
                Outcome::Applied { case: updated }
            }
            Err(e) => {
                tracing::error!("Erro ao atualizar etapa do caso {}: {}", id, e);
                self.rollback(authoritative.unwrap_or(before));
                self.refresh_period().await;
                Outcome::Failed { retry_suggested: true }
            }
        }
    }

    // =========================================================================
    //  EDIÇÃO, EXCLUSÃO E SALVAMENTO
    // =========================================================================

    /// Edição livre vinda da tela de detalhes. Etapa e histórico não mudam por aqui.
    pub async fn update_record(&self, mut updated: CollectionCase, actor: &Actor) -> Outcome {
        let id = updated.id.clone();
        let Some(_guard) = self.in_flight.try_acquire(&id) else {
            tracing::warn!("Caso {} já está sendo processado, ignorando", id);
            return Outcome::Ignored;
        };

        let Some(current) = self.case(&id) else {
            tracing::warn!("Caso {} não encontrado", id);
            return Outcome::NotFound { id };
        };

        if updated.notes != current.notes && !can_edit_notes(&current, actor) {
            tracing::warn!("{} não pode editar as observações do caso {}", actor.display_name(), id);
            return Outcome::Denied { reason: DenialReason::ForbiddenEdit };
        }
        if details_changed(&current, &updated) && !can_edit_details(&current, actor) {
            tracing::warn!("{} não pode editar os dados do caso {}", actor.display_name(), id);
            return Outcome::Denied { reason: DenialReason::ForbiddenEdit };
        }

        if let Err(errors) = validate_case(&updated) {
            return Outcome::Invalid { fields: error_codes(&errors) };
        }

        // Etapa, histórico, atraso e follow-ups têm donos próprios
        updated.stage = current.stage;
        updated.status_history = current.status_history.clone();
        updated.created_by = current.created_by.clone();
        updated.days_overdue = current.days_overdue;
        updated.follow_ups = current.follow_ups.clone();
        updated.legacy_follow_up = current.legacy_follow_up.clone();

        let (authoritative, updated) = self.apply_optimistic(updated);

        match self.store.persist(&updated).await {
            Ok(()) => {
                self.state().commit(&updated);
                tracing::info!("Dados do caso {} atualizados com sucesso", id);
                self.refresh_period().await;
                Outcome::Applied { case: updated }
            }
            Err(e) => {
                tracing::error!("Erro ao atualizar dados do caso {}: {}", id, e);
                self.rollback(authoritative.unwrap_or(current));
                self.refresh_period().await;
                Outcome::Failed { retry_suggested: true }
            }
        }
    }

    /// Exclusão não é otimista: só sai do quadro depois que o banco confirmar.
    pub async fn delete_record(&self, id: &str) -> Outcome {
        let Some(_guard) = self.in_flight.try_acquire(id) else {
            tracing::warn!("Caso {} já está sendo processado, ignorando", id);
            return Outcome::Ignored;
        };

        if self.case(id).is_none() {
            tracing::warn!("Caso {} não encontrado", id);
            return Outcome::NotFound { id: id.to_string() };
        }

        match self.store.remove(id).await {
            Ok(()) => {
                self.state().forget(id);
                self.observer.on_record_removed(id);
                tracing::info!("Caso {} excluído", id);
                Outcome::Removed { id: id.to_string() }
            }
            Err(e) => {
                tracing::error!("Erro ao excluir caso {}: {}", id, e);
                Outcome::Failed { retry_suggested: true }
            }
        }
    }

    /// Salva a cópia de trabalho inteira, mudada ou não. Sem rollback parcial:
    /// o store trata o lote como tudo ou nada. Casos com operação em andamento
    /// ficam de fora, e ficam travados enquanto o lote grava.
    pub async fn save_all(&self) -> Outcome {
        if self.saving.swap(true, Ordering::SeqCst) {
            tracing::warn!("Salvamento geral já em andamento, ignorando");
            return Outcome::Ignored;
        }
        let outcome = self.save_all_inner().await;
        self.saving.store(false, Ordering::SeqCst);
        outcome
    }

    async fn save_all_inner(&self) -> Outcome {
        let working = self.working_set();
        if working.is_empty() {
            return Outcome::Info { notice: Notice::NothingToSave };
        }

        let mut guards = Vec::with_capacity(working.len());
        let mut cases = Vec::with_capacity(working.len());
        for case in working {
            match self.in_flight.try_acquire(&case.id) {
                Some(guard) => {
                    guards.push(guard);
                    cases.push(case);
                }
                None => tracing::warn!("Caso {} em processamento, fora do salvamento geral", case.id),
            }
        }
        if cases.is_empty() {
            return Outcome::Ignored;
        }
        // Pega o que mudou entre a leitura e as travas
        let cases: Vec<CollectionCase> = cases
            .into_iter()
            .filter_map(|case| self.case(&case.id))
            .collect();

        tracing::info!("Salvando todas as alterações no banco de dados... {} casos", cases.len());
        let outcome = match self.store.persist_all(&cases).await {
            Ok(()) => {
                let mut state = self.state();
                for case in &cases {
                    // Uma recarga durante a gravação vence o lote
                    if state.working_case(&case.id) == Some(case) {
                        state.commit(case);
                    }
                }
                Outcome::Saved { count: cases.len() }
            }
            Err(e) => {
                tracing::error!("Erro ao salvar alterações: {}", e);
                Outcome::Failed { retry_suggested: true }
            }
        };
        drop(guards);
        outcome
    }

    // =========================================================================
    //  SAGA: MUTAÇÃO LOCAL / COMPENSAÇÃO
    // =========================================================================

    /// Aplica a mutação na cópia de trabalho e avisa o observador.
    /// Devolve a versão confirmada anterior (para o rollback) e o caso aplicado.
    fn apply_optimistic(&self, updated: CollectionCase) -> (Option<CollectionCase>, CollectionCase) {
        let today = self.clock.today();
        let (authoritative, applied) = {
            let mut state = self.state();
            let authoritative = state.authoritative_case(&updated.id);
            let applied = state.replace_working(updated, today);
            (authoritative, applied)
        };
        self.observer.on_record_changed(&applied);
        (authoritative, applied)
    }

    fn rollback(&self, original: CollectionCase) {
        let today = self.clock.today();
        let reverted = self.state().replace_working(original, today);
        tracing::warn!("Caso {} revertido para a última versão confirmada", reverted.id);
        self.observer.on_record_changed(&reverted);
    }

    // Depois de um reparo, traz do banco a versão com os follow-ups corrigidos
    async fn refresh_from_store(&self, id: &str) {
        match self.store.fetch(id).await {
            Ok(Some(fresh)) => {
                let today = self.clock.today();
                let applied = {
                    let mut state = self.state();
                    state.commit(&fresh);
                    state.replace_working(fresh, today)
                };
                self.observer.on_record_changed(&applied);
                self.refresh_period().await;
            }
            Ok(None) => tracing::warn!("Caso {} sumiu do banco após o reparo", id),
            Err(e) => tracing::warn!("Não foi possível recarregar o caso {} após o reparo: {}", id, e),
        }
    }
}
