// src/db/memory_repo.rs

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{FollowUpRepair, RecordStore},
    models::collection::{CollectionCase, FollowUp, StatusChange},
};

/// Armazenamento em memória, para rodar sem banco e nos testes.
/// Mantém a ordem de inserção.
#[derive(Debug, Default)]
pub struct MemoryCollectionRepository {
    cases: Mutex<Vec<CollectionCase>>,
}

impl MemoryCollectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cases(cases: Vec<CollectionCase>) -> Self {
        Self {
            cases: Mutex::new(cases),
        }
    }

    /// Cópia do que está gravado.
    pub fn snapshot(&self) -> Vec<CollectionCase> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CollectionCase>> {
        self.cases.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn upsert(cases: &mut Vec<CollectionCase>, case: &CollectionCase) {
        match cases.iter_mut().find(|c| c.id == case.id) {
            Some(stored) => {
                // O histórico gravado nunca encolhe
                let history = if stored.status_history.len() > case.status_history.len() {
                    stored.status_history.clone()
                } else {
                    case.status_history.clone()
                };
                *stored = case.clone();
                stored.status_history = history;
            }
            None => cases.push(case.clone()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryCollectionRepository {
    async fn fetch_all(&self) -> Result<Vec<CollectionCase>, AppError> {
        Ok(self.snapshot())
    }

    async fn fetch(&self, id: &str) -> Result<Option<CollectionCase>, AppError> {
        Ok(self.lock().iter().find(|c| c.id == id).cloned())
    }

    async fn persist(&self, case: &CollectionCase) -> Result<(), AppError> {
        Self::upsert(&mut self.lock(), case);
        Ok(())
    }

    async fn persist_all(&self, cases: &[CollectionCase]) -> Result<(), AppError> {
        let mut stored = self.lock();
        for case in cases {
            Self::upsert(&mut stored, case);
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), AppError> {
        let mut cases = self.lock();
        let before = cases.len();
        cases.retain(|c| c.id != id);
        if cases.len() == before {
            return Err(AppError::ResourceNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn append_status_history(&self, id: &str, change: &StatusChange) -> Result<(), AppError> {
        let mut cases = self.lock();
        let case = cases
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::ResourceNotFound(id.to_string()))?;

        case.stage = change.to_stage;
        case.status_history.append(change.clone());
        Ok(())
    }
}

#[async_trait]
impl FollowUpRepair for MemoryCollectionRepository {
    async fn repair_missing_follow_ups(&self, id: &str) -> Result<bool, AppError> {
        let mut cases = self.lock();
        let Some(case) = cases.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };

        if !case.follow_ups.is_empty() {
            return Ok(true);
        }

        let Some(content) = case
            .legacy_follow_up
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
        else {
            return Ok(false);
        };

        case.follow_ups.push(FollowUp {
            id: Uuid::new_v4().to_string(),
            content,
            created_by: case.created_by.clone(),
            created_at: Utc::now(),
        });
        Ok(true)
    }
}
