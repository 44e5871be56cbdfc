// src/db/collection_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{FollowUpRepair, RecordStore},
    models::collection::{CollectionCase, FollowUp, Stage, StatusChange, StatusHistory},
};

// --- Linhas do banco ---

#[derive(Debug, FromRow)]
struct CaseRow {
    id: String,
    display_name: String,
    course: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    amount: Decimal,
    due_date: Option<String>,
    days_overdue: i64,
    stage: Stage,
    follow_up: Option<String>,
    notes: String,
    payment_date: Option<String>,
    created_by: Option<String>,
    month: String,
    first_contact: Option<String>,
    last_contact: Option<String>,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    case_id: String,
    from_stage: Stage,
    to_stage: Stage,
    changed_by: String,
    changed_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct FollowUpRow {
    id: String,
    case_id: String,
    content: String,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl CaseRow {
    fn into_case(self, history: Vec<StatusChange>, follow_ups: Vec<FollowUp>) -> CollectionCase {
        CollectionCase {
            id: self.id,
            display_name: self.display_name,
            course: self.course,
            email: self.email,
            phone: self.phone,
            amount: self.amount,
            due_date: self.due_date,
            days_overdue: self.days_overdue,
            stage: self.stage,
            status_history: StatusHistory::from(history),
            follow_ups,
            legacy_follow_up: self.follow_up,
            notes: self.notes,
            payment_date: self.payment_date,
            created_by: self.created_by,
            month: self.month,
            first_contact: self.first_contact,
            last_contact: self.last_contact,
        }
    }
}

const CASE_COLUMNS: &str = r#"
    id, display_name, course, email, phone, amount, due_date, days_overdue,
    stage, follow_up, notes, payment_date, created_by, month,
    first_contact, last_contact
"#;

#[derive(Clone)]
pub struct PgCollectionRepository {
    pool: PgPool,
}

impl PgCollectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    async fn load_cases(&self, id: Option<&str>) -> Result<Vec<CollectionCase>, AppError> {
        let rows: Vec<CaseRow> = sqlx::query_as(&format!(
            "SELECT {CASE_COLUMNS} FROM collection_cases
             WHERE ($1::TEXT IS NULL OR id = $1)
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let history: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT case_id, from_stage, to_stage, changed_by, changed_at
            FROM case_status_history
            WHERE ($1::TEXT IS NULL OR case_id = $1)
            ORDER BY case_id, position ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let follow_ups: Vec<FollowUpRow> = sqlx::query_as(
            r#"
            SELECT id, case_id, content, created_by, created_at
            FROM case_follow_ups
            WHERE ($1::TEXT IS NULL OR case_id = $1)
            ORDER BY case_id, created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut history_by_case: HashMap<String, Vec<StatusChange>> = HashMap::new();
        for row in history {
            history_by_case.entry(row.case_id).or_default().push(StatusChange {
                from_stage: row.from_stage,
                to_stage: row.to_stage,
                changed_by: row.changed_by,
                changed_at: row.changed_at,
            });
        }

        let mut follow_ups_by_case: HashMap<String, Vec<FollowUp>> = HashMap::new();
        for row in follow_ups {
            follow_ups_by_case.entry(row.case_id).or_default().push(FollowUp {
                id: row.id,
                content: row.content,
                created_by: row.created_by,
                created_at: row.created_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let history = history_by_case.remove(&row.id).unwrap_or_default();
                let follow_ups = follow_ups_by_case.remove(&row.id).unwrap_or_default();
                row.into_case(history, follow_ups)
            })
            .collect())
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    /// Upsert dos campos do caso e dos follow-ups novos. O histórico só
    /// recebe entradas que ainda não existem (posição já gravada fica como está).
    async fn upsert(tx: &mut Transaction<'_, Postgres>, case: &CollectionCase) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO collection_cases (
                id, display_name, course, email, phone, amount, due_date, days_overdue,
                stage, follow_up, notes, payment_date, created_by, month,
                first_contact, last_contact
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                display_name  = EXCLUDED.display_name,
                course        = EXCLUDED.course,
                email         = EXCLUDED.email,
                phone         = EXCLUDED.phone,
                amount        = EXCLUDED.amount,
                due_date      = EXCLUDED.due_date,
                days_overdue  = EXCLUDED.days_overdue,
                stage         = EXCLUDED.stage,
                follow_up     = EXCLUDED.follow_up,
                notes         = EXCLUDED.notes,
                payment_date  = EXCLUDED.payment_date,
                month         = EXCLUDED.month,
                first_contact = EXCLUDED.first_contact,
                last_contact  = EXCLUDED.last_contact,
                updated_at    = NOW()
            "#,
        )
        .bind(&case.id)
        .bind(&case.display_name)
        .bind(&case.course)
        .bind(&case.email)
        .bind(&case.phone)
        .bind(case.amount)
        .bind(&case.due_date)
        .bind(case.days_overdue)
        .bind(case.stage)
        .bind(&case.legacy_follow_up)
        .bind(&case.notes)
        .bind(&case.payment_date)
        .bind(&case.created_by)
        .bind(&case.month)
        .bind(&case.first_contact)
        .bind(&case.last_contact)
        .execute(&mut **tx)
        .await?;

        for follow_up in &case.follow_ups {
            sqlx::query(
                r#"
                INSERT INTO case_follow_ups (id, case_id, content, created_by, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO UPDATE SET content = EXCLUDED.content
                "#,
            )
            .bind(&follow_up.id)
            .bind(&case.id)
            .bind(&follow_up.content)
            .bind(&follow_up.created_by)
            .bind(follow_up.created_at)
            .execute(&mut **tx)
            .await?;
        }

        for (position, entry) in case.status_history.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO case_status_history (case_id, position, from_stage, to_stage, changed_by, changed_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (case_id, position) DO NOTHING
                "#,
            )
            .bind(&case.id)
            .bind(position as i32)
            .bind(entry.from_stage)
            .bind(entry.to_stage)
            .bind(&entry.changed_by)
            .bind(entry.changed_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgCollectionRepository {
    async fn fetch_all(&self) -> Result<Vec<CollectionCase>, AppError> {
        self.load_cases(None).await
    }

    async fn fetch(&self, id: &str) -> Result<Option<CollectionCase>, AppError> {
        Ok(self.load_cases(Some(id)).await?.into_iter().next())
    }

    async fn persist(&self, case: &CollectionCase) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        Self::upsert(&mut tx, case).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn persist_all(&self, cases: &[CollectionCase]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for case in cases {
            Self::upsert(&mut tx, case).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), AppError> {
        // Histórico e follow-ups saem junto (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM collection_cases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ResourceNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn append_status_history(&self, id: &str, change: &StatusChange) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE collection_cases SET stage = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(change.to_stage)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ResourceNotFound(id.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO case_status_history (case_id, position, from_stage, to_stage, changed_by, changed_at)
            SELECT $1, COALESCE(MAX(position) + 1, 0), $2, $3, $4, $5
            FROM case_status_history
            WHERE case_id = $1
            "#,
        )
        .bind(id)
        .bind(change.from_stage)
        .bind(change.to_stage)
        .bind(&change.changed_by)
        .bind(change.changed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl FollowUpRepair for PgCollectionRepository {
    /// Casos antigos guardavam o follow-up numa coluna só. Se a lista está
    /// vazia e a coluna tem texto, vira o primeiro follow-up da lista.
    async fn repair_missing_follow_ups(&self, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM case_follow_ups WHERE case_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        // Já existem no banco: o quadro é que estava desatualizado
        if existing > 0 {
            tx.commit().await?;
            return Ok(true);
        }

        let legacy: Option<(Option<String>, Option<String>)> =
            sqlx::query_as("SELECT follow_up, created_by FROM collection_cases WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((Some(content), created_by)) = legacy else {
            return Ok(false);
        };
        if content.trim().is_empty() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO case_follow_ups (id, case_id, content, created_by, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .bind(content.trim())
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("Follow-up legado do caso {} migrado para a lista", id);
        Ok(true)
    }
}
