//! Peças compartilhadas pelos testes de integração do quadro.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Notify;

use quadro_cobranca::{
    common::error::AppError,
    db::{FollowUpRepair, MemoryCollectionRepository, RecordStore},
    models::collection::{CollectionCase, FollowUp, Stage, StatusChange},
    services::{
        change_feed::RecordObserver,
        clock::FixedClock,
        BoardController,
    },
};

// ============================================================================
// FailingStore - injeção de falhas configurável
// ============================================================================

/// Envolve o armazenamento em memória e falha as escritas que forem pedidas.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub inner: MemoryCollectionRepository,
    /// Ids cuja próxima escrita falha (consumido no uso).
    fail_on_write: RwLock<HashSet<String>>,
    /// Todas as escritas falham enquanto estiver ligado.
    fail_all_writes: AtomicBool,
    fail_reads: AtomicBool,
    /// Resultado devolvido pelo reparo de follow-ups; `None` usa o da memória.
    repair_result: Mutex<Option<Result<bool, ()>>>,
    /// Segura a gravação de etapa até `release` ser chamado.
    hold_writes: AtomicBool,
    pub entered: Notify,
    release: Notify,
    pub writes: AtomicUsize,
    pub repair_calls: AtomicUsize,
}

impl FailingStore {
    pub fn with_cases(cases: Vec<CollectionCase>) -> Self {
        Self {
            inner: MemoryCollectionRepository::with_cases(cases),
            ..Self::default()
        }
    }

    pub fn fail_next_write(&self, id: &str) {
        self.fail_on_write.write().unwrap().insert(id.to_string());
    }

    pub fn fail_all_writes(&self, fail: bool) {
        self.fail_all_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_repair_result(&self, result: Result<bool, ()>) {
        *self.repair_result.lock().unwrap() = Some(result);
    }

    pub fn hold_writes(&self) {
        self.hold_writes.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.hold_writes.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    pub fn stored(&self, id: &str) -> Option<CollectionCase> {
        self.inner.snapshot().into_iter().find(|c| c.id == id)
    }

    async fn before_write(&self, id: &str) -> Result<(), AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self.hold_writes.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        if self.fail_all_writes.load(Ordering::SeqCst) || self.fail_on_write.write().unwrap().remove(id) {
            return Err(AppError::StoreUnavailable(format!("falha injetada na escrita de {id}")));
        }
        Ok(())
    }

    fn before_read(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("falha injetada na leitura".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn fetch_all(&self) -> Result<Vec<CollectionCase>, AppError> {
        self.before_read()?;
        self.inner.fetch_all().await
    }

    async fn fetch(&self, id: &str) -> Result<Option<CollectionCase>, AppError> {
        self.before_read()?;
        self.inner.fetch(id).await
    }

    async fn persist(&self, case: &CollectionCase) -> Result<(), AppError> {
        self.before_write(&case.id).await?;
        self.inner.persist(case).await
    }

    async fn persist_all(&self, cases: &[CollectionCase]) -> Result<(), AppError> {
        self.before_write("*").await?;
        self.inner.persist_all(cases).await
    }

    async fn remove(&self, id: &str) -> Result<(), AppError> {
        self.before_write(id).await?;
        self.inner.remove(id).await
    }

    async fn append_status_history(&self, id: &str, change: &StatusChange) -> Result<(), AppError> {
        self.before_write(id).await?;
        self.inner.append_status_history(id, change).await
    }
}

#[async_trait]
impl FollowUpRepair for FailingStore {
    async fn repair_missing_follow_ups(&self, id: &str) -> Result<bool, AppError> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        let forced = *self.repair_result.lock().unwrap();
        match forced {
            Some(Ok(changed)) => Ok(changed),
            Some(Err(())) => Err(AppError::StoreUnavailable("reparo indisponível".into())),
            None => self.inner.repair_missing_follow_ups(id).await,
        }
    }
}

// ============================================================================
// Observador que grava tudo
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Changed { id: String, stage: Stage },
    Removed { id: String },
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<Seen>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Seen> {
        self.events.lock().unwrap().clone()
    }
}

impl RecordObserver for RecordingObserver {
    fn on_record_changed(&self, case: &CollectionCase) {
        self.events.lock().unwrap().push(Seen::Changed {
            id: case.id.clone(),
            stage: case.stage,
        });
    }

    fn on_record_removed(&self, id: &str) {
        self.events.lock().unwrap().push(Seen::Removed { id: id.to_string() });
    }
}

// ============================================================================
// Montagem
// ============================================================================

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
}

pub fn case(id: &str, stage: Stage) -> CollectionCase {
    let mut case = CollectionCase::new(id, format!("Aluno {id}"), "2025-01");
    case.stage = stage;
    case
}

pub fn with_follow_up(mut case: CollectionCase) -> CollectionCase {
    case.follow_ups.push(FollowUp {
        id: format!("f-{}", case.id),
        content: "Mensagem enviada por WhatsApp".into(),
        created_by: Some("maria".into()),
        created_at: Utc::now(),
    });
    case
}

pub struct Harness {
    pub store: Arc<FailingStore>,
    pub observer: Arc<RecordingObserver>,
    pub clock: Arc<FixedClock>,
    pub board: Arc<BoardController>,
}

pub async fn harness(cases: Vec<CollectionCase>) -> Harness {
    let store = Arc::new(FailingStore::with_cases(cases));
    let observer = Arc::new(RecordingObserver::default());
    let clock = Arc::new(FixedClock::at_date(today()));

    let board = BoardController::new(store.clone(), store.clone())
        .with_observer(observer.clone())
        .with_clock(clock.clone());
    board.load().await.unwrap();

    Harness {
        store,
        observer,
        clock,
        board: Arc::new(board),
    }
}
