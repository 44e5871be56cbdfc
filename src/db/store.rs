// src/db/store.rs

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::collection::{CollectionCase, StatusChange},
};

/// Fronteira de persistência dos casos. O formato no banco é problema
/// de quem implementa; o quadro só enxerga sucesso ou falha.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<CollectionCase>, AppError>;

    async fn fetch(&self, id: &str) -> Result<Option<CollectionCase>, AppError>;

    /// Grava os campos editáveis do caso (não reescreve o histórico).
    async fn persist(&self, case: &CollectionCase) -> Result<(), AppError>;

    /// Tudo ou nada.
    async fn persist_all(&self, cases: &[CollectionCase]) -> Result<(), AppError>;

    async fn remove(&self, id: &str) -> Result<(), AppError>;

    /// Grava a nova etapa junto com a entrada do histórico.
    async fn append_status_history(&self, id: &str, change: &StatusChange) -> Result<(), AppError>;
}

/// Correção automática de follow-ups perdidos na migração.
/// Devolve `true` se alterou alguma coisa.
#[async_trait]
pub trait FollowUpRepair: Send + Sync {
    async fn repair_missing_follow_ups(&self, id: &str) -> Result<bool, AppError>;
}
